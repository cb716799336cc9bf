//! Immutable, strongly-typed configuration loaded once at startup.
//!
//! Every key named in `SPEC_FULL.md` §10's configuration table is read and
//! parsed here, before any network connection is attempted. A missing or
//! unparsable key is a `ConfigError`, surfaced to `main` as exit code 1.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use arb_types::ConfigError;
use std::env;
use std::str::FromStr;

/// Default token set on Base when `TOKEN_LIST` is unset: WETH, USDbC, USDC, DAI.
const DEFAULT_TOKENS: &[&str] = &[
    "0x4200000000000000000000000000000000000006",
    "0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA",
    "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_urls: Vec<String>,
    pub ws_rpc_url: Option<String>,
    pub signer: PrivateKeySigner,
    pub contract_address: Address,
    pub token_list: Vec<Address>,
    pub min_profit_threshold: u128,
    pub max_gas_price_gwei: u64,
    pub use_gpu: bool,
    pub enable_mempool: bool,
    pub log_level: String,
    pub log_file: Option<String>,
    pub chain_id: u64,
}

impl AppConfig {
    /// Reads and validates every key from the process environment. CLI flags
    /// are applied on top by the caller, not folded in here, so this function
    /// alone documents exactly what the environment contributes.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_urls = required("RPC_URLS")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if rpc_urls.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "RPC_URLS",
                reason: "must contain at least one endpoint".to_string(),
            });
        }

        let ws_rpc_url = env::var("WS_RPC_URL").ok().filter(|s| !s.is_empty());

        let private_key = required("PRIVATE_KEY")?;
        let signer = PrivateKeySigner::from_str(private_key.trim_start_matches("0x")).map_err(|error| {
            ConfigError::InvalidValue {
                key: "PRIVATE_KEY",
                reason: error.to_string(),
            }
        })?;

        let contract_address = parse_address("CONTRACT_ADDRESS", &required("CONTRACT_ADDRESS")?)?;

        let token_list = match env::var("TOKEN_LIST").ok().filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .split(',')
                .map(|s| parse_address("TOKEN_LIST", s.trim()))
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_TOKENS
                .iter()
                .map(|s| parse_address("TOKEN_LIST", s))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let min_profit_threshold = parse_or_default("MIN_PROFIT_THRESHOLD", 10_000_000_000_000_000u128)?;
        let max_gas_price_gwei = parse_or_default("MAX_GAS_PRICE_GWEI", 100u64)?;
        let use_gpu = parse_bool_or_default("USE_GPU", false)?;
        let enable_mempool = parse_bool_or_default("ENABLE_MEMPOOL", false)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_file = env::var("LOG_FILE").ok().filter(|s| !s.is_empty());
        let chain_id = parse_or_default("CHAIN_ID", 8453u64)?;

        Ok(Self {
            rpc_urls,
            ws_rpc_url,
            signer,
            contract_address,
            token_list,
            min_profit_threshold,
            max_gas_price_gwei,
            use_gpu,
            enable_mempool,
            log_level,
            log_file,
            chain_id,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingKey(key))
}

fn parse_address(key: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw).map_err(|error| ConfigError::InvalidValue {
        key,
        reason: error.to_string(),
    })
}

fn parse_or_default<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key).ok().filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<T>().map_err(|error| ConfigError::InvalidValue {
            key,
            reason: error.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool_or_default(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key).ok().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key,
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "RPC_URLS",
            "WS_RPC_URL",
            "PRIVATE_KEY",
            "CONTRACT_ADDRESS",
            "TOKEN_LIST",
            "MIN_PROFIT_THRESHOLD",
            "MAX_GAS_PRICE_GWEI",
            "USE_GPU",
            "ENABLE_MEMPOOL",
            "LOG_LEVEL",
            "LOG_FILE",
            "CHAIN_ID",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_key_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingKey("RPC_URLS"))));
    }

    #[test]
    fn well_formed_environment_parses_with_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("RPC_URLS", "https://a.example,https://b.example");
        env::set_var("PRIVATE_KEY", "0x0000000000000000000000000000000000000000000000000000000000000011");
        env::set_var("CONTRACT_ADDRESS", "0x1000000000000000000000000000000000000001");

        let config = AppConfig::from_env().expect("well-formed environment should parse");
        assert_eq!(config.rpc_urls.len(), 2);
        assert_eq!(config.token_list.len(), DEFAULT_TOKENS.len());
        assert_eq!(config.chain_id, 8453);
        assert_eq!(config.max_gas_price_gwei, 100);
        assert!(!config.use_gpu);
        clear_all();
    }

    #[test]
    fn invalid_contract_address_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("RPC_URLS", "https://a.example");
        env::set_var("PRIVATE_KEY", "0x0000000000000000000000000000000000000000000000000000000000000011");
        env::set_var("CONTRACT_ADDRESS", "not-an-address");

        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "CONTRACT_ADDRESS", .. })));
        clear_all();
    }
}
