//! Persisted key-value storage and the wallet list built on top of it.

use async_trait::async_trait;
use shared::Result;

pub mod file;
pub mod memory;
pub mod wallet_store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use wallet_store::WalletStore;

/// Logical keys under which the tracker persists its blobs
pub mod keys {
    pub const WALLETS: &str = "solana_tracker:wallets";
    pub const TOKEN_CACHE: &str = "solana_tracker:token_cache";
    pub const PRICE_CACHE: &str = "solana_tracker:price_cache";

    pub const ALL: [&str; 3] = [WALLETS, TOKEN_CACHE, PRICE_CACHE];
}

/// String-keyed blob store. Values are whole JSON documents; there are no
/// partial writes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if the key was never set
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every listed key; absent keys are ignored
    async fn remove(&self, keys: &[&str]) -> Result<()>;
}
