use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::config::TokenListConfig;
use shared::models::TokenMetadata;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use storage::{keys, KeyValueStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Persisted form of the token directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCacheSnapshot {
    pub data: HashMap<String, TokenMetadata>,
    /// Milliseconds since the unix epoch
    pub timestamp: i64,
}

impl TokenCacheSnapshot {
    pub fn new(data: HashMap<String, TokenMetadata>) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// A snapshot stamped in the future (clock moved back, edited file)
    /// is never fresh.
    pub fn is_fresh(&self, ttl: std::time::Duration) -> bool {
        let age_ms = Utc::now().timestamp_millis().saturating_sub(self.timestamp);
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        (0..ttl_ms).contains(&age_ms)
    }
}

/// Token symbol/name directory keyed by mint address.
///
/// Loaded lazily from a persisted snapshot younger than the configured TTL,
/// otherwise from the directory feed. If the feed fails a stale snapshot is
/// used when one exists. Missing metadata is never an error.
pub struct TokenMetadataService {
    client: Client,
    config: TokenListConfig,
    kv: Arc<dyn KeyValueStore>,
    tokens: RwLock<HashMap<String, TokenMetadata>>,
    initialized: AtomicBool,
    // Held for the whole load so concurrent callers share one fetch
    load_lock: Mutex<()>,
}

impl TokenMetadataService {
    pub fn new(config: TokenListConfig, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client: Client::new(),
            config,
            kv,
            tokens: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            load_lock: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn token_count(&self) -> usize {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Populate the directory if it is not loaded yet.
    ///
    /// Returns once the directory is loaded or the attempt has failed.
    /// Callers arriving during a load wait for it instead of starting another.
    pub async fn load_token_list(&self) {
        if self.is_loaded() {
            return;
        }

        let _guard = self.load_lock.lock().await;
        if self.is_loaded() {
            return;
        }

        let cached = self.read_snapshot().await;

        if let Some(snapshot) = &cached {
            if snapshot.is_fresh(self.config.cache_ttl) {
                info!("Token list loaded from cache ({} tokens)", snapshot.data.len());
                self.adopt(snapshot.data.clone());
                return;
            }
            debug!("Cached token list is stale, fetching a new one");
        }

        match self.fetch_directory().await {
            Ok(tokens) => {
                let data: HashMap<String, TokenMetadata> = tokens
                    .into_iter()
                    .map(|t| (t.address.clone(), t))
                    .collect();

                info!("Token list loaded: {} tokens", data.len());
                self.write_snapshot(TokenCacheSnapshot::new(data.clone())).await;
                self.adopt(data);
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(
                        "Token list fetch failed ({}), using stale cache of {} tokens",
                        e,
                        stale.data.len()
                    );
                    self.adopt(stale.data);
                }
                None => {
                    warn!("Token list loading failed, continuing without metadata: {}", e);
                }
            },
        }
    }

    /// Lookup by mint; never triggers a fetch
    pub fn get_token_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(mint)
            .cloned()
    }

    /// Metadata for every mint in `mints` that the directory knows
    pub fn get_multiple_token_metadata(&self, mints: &[String]) -> HashMap<String, TokenMetadata> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        mints
            .iter()
            .filter_map(|mint| tokens.get(mint).map(|m| (mint.clone(), m.clone())))
            .collect()
    }

    /// Case-insensitive substring match on symbol or name, ordered by symbol
    pub fn search_tokens(&self, query: &str) -> Vec<TokenMetadata> {
        let query = query.to_lowercase();
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);

        let mut matches: Vec<TokenMetadata> = tokens
            .values()
            .filter(|t| {
                t.symbol.to_lowercase().contains(&query) || t.name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.address.cmp(&b.address)));
        matches
    }

    fn adopt(&self, data: HashMap<String, TokenMetadata>) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = data;
        self.initialized.store(true, Ordering::Release);
    }

    async fn read_snapshot(&self) -> Option<TokenCacheSnapshot> {
        match self.kv.get(keys::TOKEN_CACHE).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Ignoring unreadable token cache: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read token cache: {}", e);
                None
            }
        }
    }

    async fn write_snapshot(&self, snapshot: TokenCacheSnapshot) {
        let result = match serde_json::to_string(&snapshot) {
            Ok(json) => self.kv.set(keys::TOKEN_CACHE, &json).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            warn!("Failed to persist token cache: {}", e);
        }
    }

    async fn fetch_directory(&self) -> Result<Vec<TokenMetadata>> {
        debug!("Fetching token list from {}", self.config.url);

        let response = self
            .client
            .get(&self.config.url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Token list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Failed to fetch token list: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Vec<TokenMetadata>>()
            .await
            .map_err(|e| Error::ExternalService(format!("Malformed token list: {}", e)))
    }
}
