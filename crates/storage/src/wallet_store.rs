use shared::models::{Wallet, WalletUpdate};
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{keys, KeyValueStore};

/// Ordered list of tracked wallets, persisted as a single JSON array.
///
/// Every mutation reads the full list, changes it in memory and writes the
/// full list back.
#[derive(Clone)]
pub struct WalletStore {
    kv: Arc<dyn KeyValueStore>,
}

impl WalletStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load all tracked wallets in insertion order
    pub async fn load_wallets(&self) -> Result<Vec<Wallet>> {
        match self.kv.get(keys::WALLETS).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Storage(format!("Stored wallet list is unreadable: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    /// Overwrite the whole wallet list
    pub async fn save_wallets(&self, wallets: &[Wallet]) -> Result<()> {
        let json = serde_json::to_string(wallets)?;
        self.kv.set(keys::WALLETS, &json).await?;
        debug!("Saved {} wallets", wallets.len());
        Ok(())
    }

    /// Append a wallet; fails if its address is already tracked
    pub async fn add_wallet(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.load_wallets().await?;

        if wallets.iter().any(|w| w.address == wallet.address) {
            return Err(Error::WalletAlreadyExists(wallet.address));
        }

        wallets.push(wallet);
        self.save_wallets(&wallets).await
    }

    /// Merge `update` into the stored wallet and return the merged record
    pub async fn update_wallet(&self, address: &str, update: WalletUpdate) -> Result<Wallet> {
        let mut wallets = self.load_wallets().await?;

        let wallet = wallets
            .iter_mut()
            .find(|w| w.address == address)
            .ok_or_else(|| Error::WalletNotFound(address.to_string()))?;

        update.apply_to(wallet);
        let updated = wallet.clone();

        self.save_wallets(&wallets).await?;
        Ok(updated)
    }

    /// Stop tracking `address`. Unknown addresses are a no-op and cause no
    /// write.
    pub async fn remove_wallet(&self, address: &str) -> Result<bool> {
        let mut wallets = self.load_wallets().await?;
        let before = wallets.len();

        wallets.retain(|w| w.address != address);

        if wallets.len() == before {
            debug!("Wallet {} not tracked, nothing to remove", address);
            return Ok(false);
        }

        self.save_wallets(&wallets).await?;
        Ok(true)
    }

    /// Drop the wallet list and both caches
    pub async fn clear_all(&self) -> Result<()> {
        info!("Clearing all persisted tracker data");
        self.kv.remove(&keys::ALL).await
    }
}
