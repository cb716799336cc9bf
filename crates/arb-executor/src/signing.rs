//! Builds and signs EIP-1559 transactions without going through a `Provider`.
//!
//! The Executor only has the small `RpcAdapter` surface (§4.1) to send a
//! transaction, so unlike a client built directly on `alloy`'s filler stack
//! it must construct and sign the envelope itself before handing raw bytes
//! to `send_raw_transaction`.

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use eyre::Result;

pub struct SignedTx {
    pub raw: Bytes,
    pub tx_hash: B256,
}

/// Builds an EIP-1559 transaction envelope and signs it with `signer`.
#[allow(clippy::too_many_arguments)]
pub async fn build_and_sign(
    signer: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    to: Address,
    value: U256,
    data: Bytes,
    gas_limit: u64,
    max_fee_per_gas: u128,
    max_priority_fee_per_gas: u128,
) -> Result<SignedTx> {
    let mut tx = TxEip1559 {
        chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        to: TxKind::Call(to),
        value,
        access_list: Default::default(),
        input: data,
    };

    let signature = signer.sign_transaction(&mut tx).await?;
    let signed = tx.into_signed(signature);
    let tx_hash = *signed.hash();
    let envelope = TxEnvelope::Eip1559(signed);
    let raw = Bytes::from(envelope.encoded_2718());

    Ok(SignedTx { raw, tx_hash })
}
