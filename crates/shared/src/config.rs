use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solana: SolanaConfig,
    pub token_list: TokenListConfig,
    pub price: PriceConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub commitment: String,
    /// Maximum number of signatures fetched per wallet
    pub transaction_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenListConfig {
    pub url: String,
    /// Upper bound on the directory download
    pub fetch_timeout: Duration,
    /// Age after which a persisted snapshot is re-fetched
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    pub api_url: String,
    pub cache_ttl: Duration,
    /// When false the no-op price source is wired in
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            transaction_limit: 20,
        }
    }
}

impl Default for TokenListConfig {
    fn default() -> Self {
        Self {
            url: "https://token.jup.ag/all".to_string(),
            fetch_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://price.jup.ag/v4".to_string(),
            cache_ttl: Duration::from_secs(60),
            enabled: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wallet-tracker"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solana: SolanaConfig::default(),
            token_list: TokenListConfig::default(),
            price: PriceConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        if dotenv::dotenv().is_err() {
            tracing::debug!("No .env file found, reading process environment only");
        }

        let defaults = Config::default();

        Ok(Config {
            solana: SolanaConfig {
                rpc_url: env::var("SOLANA_RPC_URL").unwrap_or(defaults.solana.rpc_url),
                commitment: env::var("SOLANA_COMMITMENT").unwrap_or(defaults.solana.commitment),
                transaction_limit: parse_var("TRANSACTION_LIMIT", defaults.solana.transaction_limit)?,
            },
            token_list: TokenListConfig {
                url: env::var("TOKEN_LIST_URL").unwrap_or(defaults.token_list.url),
                fetch_timeout: Duration::from_secs(parse_var(
                    "TOKEN_LIST_TIMEOUT_SECS",
                    defaults.token_list.fetch_timeout.as_secs(),
                )?),
                cache_ttl: Duration::from_secs(parse_var(
                    "TOKEN_CACHE_TTL_SECS",
                    defaults.token_list.cache_ttl.as_secs(),
                )?),
            },
            price: PriceConfig {
                api_url: env::var("JUPITER_PRICE_API").unwrap_or(defaults.price.api_url),
                cache_ttl: Duration::from_secs(parse_var(
                    "PRICE_CACHE_TTL_SECS",
                    defaults.price.cache_ttl.as_secs(),
                )?),
                enabled: parse_var("PRICE_FEED_ENABLED", defaults.price.enabled)?,
            },
            storage: StorageConfig {
                data_dir: env::var("TRACKER_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.data_dir),
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
