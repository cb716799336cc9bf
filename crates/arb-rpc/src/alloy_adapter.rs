//! Live `RpcAdapter` backed by `alloy` HTTP providers, one per configured endpoint.
//!
//! Grounded on the provider type and connectivity-check pattern of
//! `BlockFetcher` in the teacher project's block-fetching module, extended
//! with the endpoint-failover discipline `SPEC_FULL.md` §4.1 requires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, Identity, JoinFill, NonceFiller,
};
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy::rpc::types::eth::{BlockId, BlockNumberOrTag, BlockTransactionsKind};
use async_trait::async_trait;
use eyre::{eyre, Context, Result};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;

use crate::adapter::{
    BlockHeader, RawLog, RpcAdapter, TransactionInfo, TransactionReceiptInfo, TxRequest,
};
use crate::ring::EndpointRing;

type ProviderType = FillProvider<
    JoinFill<Identity, JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>>,
    RootProvider<Ethereum>,
>;

/// Network-level timeout per `SPEC_FULL.md` §5: RPC calls are bounded at 10s.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the HTTP-polling fallback checks for a new block when no
/// `WS_RPC_URL` is configured.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct ProviderState {
    ring: EndpointRing,
    provider: Arc<ProviderType>,
}

fn build_provider(url: &str) -> Result<Arc<ProviderType>> {
    let provider = ProviderBuilder::new().on_http(url.parse().wrap_err("invalid RPC URL format")?);
    Ok(Arc::new(provider))
}

/// Live RPC adapter with HTTP failover across a configured endpoint ring.
///
/// Subscriptions (`subscribe_new_heads`/`subscribe_pending_tx`) use a
/// separate, single `WS_RPC_URL` connection per `SPEC_FULL.md` §6 — the
/// failover ring governs the read/write HTTP endpoints only. Without a
/// configured WS endpoint, new-head delivery falls back to polling
/// `eth_blockNumber` over the HTTP ring at `POLL_INTERVAL`, which satisfies
/// the same "finite, must-resubscribe" stream contract at lower fidelity.
pub struct AlloyRpcAdapter {
    state: RwLock<ProviderState>,
    ws_url: Option<String>,
}

impl AlloyRpcAdapter {
    /// Builds an adapter over `urls` and verifies connectivity against the
    /// first endpoint via `eth_blockNumber`, as the teacher's `BlockFetcher::new` does.
    pub async fn new(urls: impl IntoIterator<Item = String>) -> Result<Self> {
        Self::with_ws(urls, None).await
    }

    /// As [`Self::new`], additionally recording a WebSocket endpoint that
    /// `subscribe_new_heads`/`subscribe_pending_tx` dial directly rather than
    /// going through the HTTP failover ring.
    pub async fn with_ws(urls: impl IntoIterator<Item = String>, ws_url: Option<String>) -> Result<Self> {
        let ring = EndpointRing::new(urls);
        let provider = build_provider(&ring.current().url)?;

        provider
            .get_block_number()
            .await
            .wrap_err("failed to test RPC connectivity with eth_blockNumber")?;

        Ok(Self {
            state: RwLock::new(ProviderState { ring, provider }),
            ws_url,
        })
    }

    /// Runs `op` against the current provider under a 10s timeout. On a
    /// transport-level failure (timeout or connection error) the ring
    /// advances once and the operation is retried exactly once; a second
    /// failure surfaces to the caller, per `SPEC_FULL.md` §4.1.
    async fn with_failover<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T>
    where
        F: Fn(Arc<ProviderType>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let provider = { self.state.read().await.provider.clone() };
        match tokio::time::timeout(CALL_TIMEOUT, op(provider)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                tracing::warn!(op = op_name, error = %err, "RPC call failed; switching endpoint");
            }
            Err(_) => {
                tracing::warn!(op = op_name, timeout_secs = CALL_TIMEOUT.as_secs(), "RPC call timed out; switching endpoint");
            }
        }

        let provider = {
            let mut state = self.state.write().await;
            state.ring.advance();
            let provider = build_provider(&state.ring.current().url)?;
            state.provider = provider.clone();
            provider
        };

        tokio::time::timeout(CALL_TIMEOUT, op(provider))
            .await
            .map_err(|_| eyre!("{op_name} timed out after failover retry"))?
            .wrap_err_with(|| format!("{op_name} failed after failover retry"))
    }
}

#[async_trait]
impl RpcAdapter for AlloyRpcAdapter {
    async fn get_block_latest(&self) -> Result<BlockHeader> {
        self.with_failover("get_block_latest", |provider| async move {
            let block = provider
                .get_block(BlockId::Number(BlockNumberOrTag::Latest))
                .await?
                .ok_or_else(|| eyre!("latest block missing from RPC response"))?;
            Ok(BlockHeader {
                number: block.header.number,
                hash: block.header.hash,
                base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
                transactions: block.transactions.hashes().collect(),
            })
        })
        .await
    }

    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>> {
        self.with_failover("get_block_by_hash", move |provider| async move {
            let block = provider
                .get_block_by_hash(hash, BlockTransactionsKind::Hashes)
                .await?;
            Ok(block.map(|block| BlockHeader {
                number: block.header.number,
                hash: block.header.hash,
                base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
                transactions: block.transactions.hashes().collect(),
            }))
        })
        .await
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>> {
        self.with_failover("get_transaction", move |provider| async move {
            let tx = provider.get_transaction_by_hash(hash).await?;
            Ok(tx.map(|tx| TransactionInfo {
                hash,
                from: tx.inner.signer(),
                to: tx.inner.to(),
                nonce: tx.inner.nonce(),
            }))
        })
        .await
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceiptInfo>> {
        self.with_failover("get_transaction_receipt", move |provider| async move {
            let receipt = provider.get_transaction_receipt(hash).await?;
            Ok(receipt.map(|receipt| TransactionReceiptInfo {
                transaction_hash: hash,
                status: receipt.status(),
                gas_used: receipt.gas_used,
                effective_gas_price: receipt.effective_gas_price,
                logs: receipt
                    .inner
                    .logs()
                    .iter()
                    .map(|log| RawLog {
                        address: log.address(),
                        topics: log.topics().to_vec(),
                        data: log.data().data.clone(),
                    })
                    .collect(),
            }))
        })
        .await
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.with_failover("get_balance", move |provider| async move {
            Ok(provider.get_balance(address).await?)
        })
        .await
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.with_failover("get_transaction_count", move |provider| async move {
            Ok(provider.get_transaction_count(address).await?)
        })
        .await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        self.with_failover("call", move |provider| {
            let calldata = calldata.clone();
            async move {
                let tx = alloy::rpc::types::eth::TransactionRequest::default()
                    .to(to)
                    .input(calldata.into());
                Ok(provider.call(tx).await?)
            }
        })
        .await
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        let tx = tx.clone();
        self.with_failover("estimate_gas", move |provider| {
            let tx = tx.clone();
            async move {
                let mut request = alloy::rpc::types::eth::TransactionRequest::default()
                    .to(tx.to)
                    .from(tx.from)
                    .value(tx.value)
                    .input(tx.data.clone().into());
                if let Some(nonce) = tx.nonce {
                    request = request.nonce(nonce);
                }
                Ok(provider.estimate_gas(request).await?)
            }
        })
        .await
    }

    async fn send_raw_transaction(&self, signed: Bytes) -> Result<B256> {
        // A failed send must never be retried silently against a second
        // endpoint — the caller owns the nonce-consumption decision per
        // SPEC_FULL.md §4.1, so this bypasses `with_failover`'s retry and
        // surfaces the first failure directly.
        let provider = { self.state.read().await.provider.clone() };
        let pending = tokio::time::timeout(CALL_TIMEOUT, provider.send_raw_transaction(&signed))
            .await
            .map_err(|_| eyre!("send_raw_transaction timed out"))?
            .wrap_err("send_raw_transaction rejected by RPC")?;
        Ok(*pending.tx_hash())
    }

    async fn subscribe_new_heads(&self) -> Result<BoxStream<'static, BlockHeader>> {
        if let Some(ws_url) = &self.ws_url {
            let ws_provider = ProviderBuilder::new()
                .on_ws(WsConnect::new(ws_url.clone()))
                .await
                .wrap_err("failed to establish WS connection for new-heads subscription")?;
            let subscription = ws_provider
                .subscribe_blocks()
                .await
                .wrap_err("failed to subscribe to new heads over WS")?;
            let stream = subscription.into_stream().map(|header| BlockHeader {
                number: header.number,
                hash: header.hash,
                base_fee_per_gas: header.base_fee_per_gas.map(u128::from),
                transactions: Vec::new(),
            });
            return Ok(stream.boxed());
        }

        // Without a configured WS endpoint, poll `eth_blockNumber` over the
        // HTTP ring as a lower-fidelity stand-in with the same "finite,
        // must-resubscribe" stream contract.
        let provider = { self.state.read().await.provider.clone() };
        let last_seen = provider.get_block_number().await.unwrap_or(0);
        let stream = stream::unfold((provider, last_seen), move |(provider, mut last_seen)| async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                let Ok(number) = provider.get_block_number().await else {
                    return None;
                };
                if number <= last_seen {
                    continue;
                }
                last_seen = number;
                let Ok(Some(block)) = provider
                    .get_block(BlockId::Number(BlockNumberOrTag::Number(number)))
                    .await
                else {
                    continue;
                };
                let header = BlockHeader {
                    number: block.header.number,
                    hash: block.header.hash,
                    base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
                    transactions: block.transactions.hashes().collect(),
                };
                return Some((header, (provider, last_seen)));
            }
        });
        Ok(stream.boxed())
    }

    async fn subscribe_pending_tx(&self) -> Result<BoxStream<'static, B256>> {
        let Some(ws_url) = &self.ws_url else {
            return Err(eyre!("pending-transaction subscription requires a configured WS_RPC_URL"));
        };
        let ws_provider = ProviderBuilder::new()
            .on_ws(WsConnect::new(ws_url.clone()))
            .await
            .wrap_err("failed to establish WS connection for pending-tx subscription")?;
        let subscription = ws_provider
            .subscribe_pending_transactions()
            .await
            .wrap_err("failed to subscribe to pending transactions over WS")?;
        Ok(subscription.into_stream().boxed())
    }

    fn current_endpoint(&self) -> String {
        // Best-effort synchronous read; callers needing a guaranteed
        // up-to-date value should prefer the async accessors above.
        self.state
            .try_read()
            .map(|state| state.ring.current().url.clone())
            .unwrap_or_else(|_| "<locked>".to_string())
    }

    fn advance_endpoint(&self) {
        let Ok(mut state) = self.state.try_write() else {
            tracing::warn!("advance_endpoint called while adapter state locked; skipping");
            return;
        };
        state.ring.advance();
        match build_provider(&state.ring.current().url) {
            Ok(provider) => state.provider = provider,
            Err(error) => tracing::error!(error = %error, "failed to rebuild provider after forced endpoint switch"),
        }
    }
}
