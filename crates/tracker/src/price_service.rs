use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::config::PriceConfig;
use shared::models::TokenPrice;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Wrapped SOL mint, used to price the native balance
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub type PriceData = HashMap<String, TokenPrice>;

/// Source of USD prices keyed by mint.
///
/// Price lookups never fail: an unavailable price is simply absent.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn get_prices(&self, mints: &[String]) -> PriceData;

    async fn get_sol_price(&self) -> f64 {
        self.get_prices(&[WRAPPED_SOL_MINT.to_string()])
            .await
            .get(WRAPPED_SOL_MINT)
            .map(|p| p.price)
            .unwrap_or(0.0)
    }
}

/// Price source that knows no prices
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPriceSource;

#[async_trait]
impl PriceSource for NoopPriceSource {
    async fn get_prices(&self, _mints: &[String]) -> PriceData {
        PriceData::new()
    }
}

#[derive(Debug, Deserialize)]
struct JupiterPriceResponse {
    #[serde(default)]
    data: HashMap<String, JupiterPrice>,
}

#[derive(Debug, Deserialize)]
struct JupiterPrice {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default, rename = "change24h")]
    change_24h: Option<f64>,
}

/// Jupiter price API client with a short-lived in-memory cache
pub struct JupiterPriceSource {
    client: Client,
    api_url: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, PriceData)>>,
}

impl JupiterPriceSource {
    pub fn new(config: &PriceConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            cache_ttl: config.cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    fn cache_key(mints: &[String]) -> String {
        let mut sorted: Vec<&str> = mints.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join(",")
    }

    /// Cache a fresh result, dropping entries that have expired
    async fn remember(&self, key: String, data: PriceData) {
        let mut cache = self.cache.lock().await;
        cache.retain(|_, (fetched_at, _)| fetched_at.elapsed() < self.cache_ttl);
        cache.insert(key, (Instant::now(), data));
    }

    async fn fetch(&self, mints: &[String]) -> Result<PriceData> {
        let ids = mints.join(",");
        debug!("Fetching prices for {} mints", mints.len());

        let response = self
            .client
            .get(format!("{}/price", self.api_url))
            .query(&[("ids", ids.as_str())])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Price request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Failed to fetch prices: HTTP {}",
                response.status()
            )));
        }

        let body: JupiterPriceResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Malformed price response: {}", e)))?;

        Ok(body
            .data
            .into_iter()
            .map(|(mint, p)| {
                (
                    mint,
                    TokenPrice {
                        price: p.price.unwrap_or(0.0),
                        change_24h: p.change_24h,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl PriceSource for JupiterPriceSource {
    async fn get_prices(&self, mints: &[String]) -> PriceData {
        if mints.is_empty() {
            return PriceData::new();
        }

        let key = Self::cache_key(mints);
        if let Some((fetched_at, data)) = self.cache.lock().await.get(&key) {
            if fetched_at.elapsed() < self.cache_ttl {
                return data.clone();
            }
        }

        match self.fetch(mints).await {
            Ok(data) => {
                self.remember(key, data.clone()).await;
                data
            }
            Err(e) => {
                warn!("Error fetching prices: {}", e);
                PriceData::new()
            }
        }
    }
}

/// Live source when enabled in config, otherwise the no-op source
pub fn price_source_from_config(config: &PriceConfig) -> Arc<dyn PriceSource> {
    if config.enabled {
        Arc::new(JupiterPriceSource::new(config))
    } else {
        Arc::new(NoopPriceSource)
    }
}
