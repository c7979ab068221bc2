use blockchain::SolanaRpc;
use chrono::Utc;
use futures::future::join_all;
use shared::models::{normalize_nickname, palette_color, Wallet, WalletSnapshot, WalletUpdate};
use shared::validation::validate_address;
use shared::{Error, Result};
use std::fmt;
use std::sync::Arc;
use storage::WalletStore;
use tracing::{debug, info, warn};

/// Stages an add-wallet operation passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddWalletStage {
    Validating,
    Probing,
    Persisting,
}

impl fmt::Display for AddWalletStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddWalletStage::Validating => write!(f, "validating"),
            AddWalletStage::Probing => write!(f, "probing"),
            AddWalletStage::Persisting => write!(f, "persisting"),
        }
    }
}

/// Outcome of a bulk refresh
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// The full list as persisted, fresh and stale wallets mixed
    pub wallets: Vec<Wallet>,
    /// Addresses that kept their previous snapshot
    pub failed: Vec<String>,
}

impl RefreshReport {
    pub fn refreshed_count(&self) -> usize {
        self.wallets.len() - self.failed.len()
    }
}

/// Wallet service for tracking a list of Solana wallets
///
/// Combines the RPC client and the wallet store. Single-wallet operations
/// abort on the first failure without writing anything; `refresh_all`
/// isolates failures per wallet.
pub struct WalletService {
    rpc: Arc<dyn SolanaRpc>,
    store: WalletStore,
    transaction_limit: usize,
}

impl WalletService {
    /// Create a new wallet service
    pub fn new(rpc: Arc<dyn SolanaRpc>, store: WalletStore, transaction_limit: usize) -> Self {
        Self {
            rpc,
            store,
            transaction_limit,
        }
    }

    /// Current persisted wallet list
    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        self.store.load_wallets().await
    }

    pub async fn wallet(&self, address: &str) -> Result<Wallet> {
        self.store
            .load_wallets()
            .await?
            .into_iter()
            .find(|w| w.address == address)
            .ok_or_else(|| Error::WalletNotFound(address.to_string()))
    }

    /// Run the balance, token and signature probes one after another.
    ///
    /// The snapshot is only built if all three succeed.
    async fn fetch_snapshot(&self, address: &str) -> Result<WalletSnapshot> {
        let balance = self.rpc.get_balance(address).await?;
        let tokens = self.rpc.get_token_accounts(address).await?;
        let transactions = self
            .rpc
            .get_transaction_signatures(address, self.transaction_limit)
            .await?;

        Ok(WalletSnapshot {
            balance,
            tokens,
            transactions,
            last_updated: Utc::now(),
        })
    }

    /// Start tracking a wallet.
    ///
    /// The wallet is stored only with a complete initial snapshot; if any
    /// probe fails nothing is written.
    pub async fn add_wallet(&self, address: &str, nickname: Option<String>) -> Result<Wallet> {
        debug!("add_wallet {}: {}", address, AddWalletStage::Validating);
        validate_address(address).map_err(|e| {
            warn!("Rejected wallet address {}", address);
            e
        })?;

        debug!("add_wallet {}: {}", address, AddWalletStage::Probing);
        let snapshot = self.fetch_snapshot(address).await.map_err(|e| {
            warn!("Initial fetch for wallet {} failed: {}", address, e);
            e
        })?;

        debug!("add_wallet {}: {}", address, AddWalletStage::Persisting);
        let existing = self.store.load_wallets().await?.len();
        let wallet = Wallet::new(
            address.to_string(),
            normalize_nickname(nickname),
            palette_color(existing).to_string(),
            snapshot,
        );

        self.store.add_wallet(wallet.clone()).await?;

        info!(
            "Tracking wallet {} ({} tokens, {} transactions)",
            address,
            wallet.snapshot.tokens.len(),
            wallet.snapshot.transactions.len()
        );
        Ok(wallet)
    }

    /// Stop tracking a wallet; unknown addresses are ignored
    pub async fn remove_wallet(&self, address: &str) -> Result<()> {
        if self.store.remove_wallet(address).await? {
            info!("Stopped tracking wallet {}", address);
        }
        Ok(())
    }

    pub async fn update_wallet(&self, address: &str, update: WalletUpdate) -> Result<Wallet> {
        self.store.update_wallet(address, update).await
    }

    /// Re-fetch one wallet's snapshot. Nickname and color are kept.
    pub async fn refresh_one(&self, address: &str) -> Result<Wallet> {
        // Fail fast before touching the network
        self.wallet(address).await?;

        let snapshot = self.fetch_snapshot(address).await.map_err(|e| {
            warn!("Refresh of wallet {} failed: {}", address, e);
            e
        })?;

        let wallet = self
            .store
            .update_wallet(address, WalletUpdate::snapshot(snapshot))
            .await?;

        debug!("Refreshed wallet {}", address);
        Ok(wallet)
    }

    /// Refresh every tracked wallet concurrently.
    ///
    /// A wallet whose fetch fails keeps its previous snapshot. The whole
    /// list is written once, after every fetch has finished.
    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        let wallets = self.store.load_wallets().await?;
        if wallets.is_empty() {
            return Ok(RefreshReport {
                wallets,
                failed: Vec::new(),
            });
        }

        info!("Refreshing {} wallets", wallets.len());

        let results = join_all(wallets.iter().map(|w| self.fetch_snapshot(&w.address))).await;

        let mut failed = Vec::new();
        let merged: Vec<Wallet> = wallets
            .into_iter()
            .zip(results)
            .map(|(mut wallet, result)| {
                match result {
                    Ok(snapshot) => wallet.snapshot = snapshot,
                    Err(e) => {
                        warn!("Keeping stale data for wallet {}: {}", wallet.address, e);
                        failed.push(wallet.address.clone());
                    }
                }
                wallet
            })
            .collect();

        self.store.save_wallets(&merged).await?;

        let report = RefreshReport {
            wallets: merged,
            failed,
        };
        info!(
            "Refreshed {}/{} wallets",
            report.refreshed_count(),
            report.wallets.len()
        );
        Ok(report)
    }
}
