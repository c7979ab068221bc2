use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Display colors assigned to wallets in insertion order
pub const WALLET_PALETTE: [&str; 6] = [
    "#8B5CF6", // purple
    "#EC4899", // pink
    "#F59E0B", // amber
    "#10B981", // emerald
    "#3B82F6", // blue
    "#EF4444", // red
];

/// Palette entry for the wallet that would become the `existing_count + 1`th
pub fn palette_color(existing_count: usize) -> &'static str {
    WALLET_PALETTE[existing_count % WALLET_PALETTE.len()]
}

// Balance models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolBalance {
    pub lamports: u64,
    pub sol: f64,
}

impl SolBalance {
    /// Build a balance from lamports; `sol` is always derived, never supplied.
    pub fn from_lamports(lamports: u64) -> Self {
        Self {
            lamports,
            sol: lamports as f64 / LAMPORTS_PER_SOL as f64,
        }
    }
}

/// One SPL token balance held by a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    /// The token account, not the mint
    pub account_address: String,
    pub mint: String,
    pub owner_address: String,
    pub raw_amount: String, // Using String to preserve precision
    pub decimals: u8,
    pub ui_amount: f64,
}

/// One signature observed for a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub signature: String,
    pub slot: u64,
    /// `None` until the node reports a block time
    pub block_time: Option<i64>,
    /// `None` on success, otherwise the node's error payload
    pub err: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TransactionSummary {
    pub fn is_success(&self) -> bool {
        self.err.is_none()
    }
}

/// Everything fetched from the node for a wallet in one refresh cycle.
///
/// These fields are only ever replaced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub balance: SolBalance,
    pub tokens: Vec<TokenHolding>,
    /// Newest first, as returned by the node
    pub transactions: Vec<TransactionSummary>,
    pub last_updated: DateTime<Utc>,
}

// Wallet models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub color: String,
    #[serde(flatten)]
    pub snapshot: WalletSnapshot,
}

impl Wallet {
    pub fn new(address: String, nickname: Option<String>, color: String, snapshot: WalletSnapshot) -> Self {
        Self {
            address,
            nickname,
            color,
            snapshot,
        }
    }

    /// Nickname if set, otherwise the address
    pub fn label(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.address)
    }
}

/// Trimmed nickname; blank input means no nickname
pub fn normalize_nickname(nickname: Option<String>) -> Option<String> {
    nickname
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Partial update applied to a stored wallet.
///
/// `None` leaves a field untouched. The address is the identity key and is
/// not updatable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletUpdate {
    /// `Some(None)` clears the nickname
    pub nickname: Option<Option<String>>,
    pub color: Option<String>,
    pub snapshot: Option<WalletSnapshot>,
}

impl WalletUpdate {
    pub fn nickname(nickname: impl Into<String>) -> Self {
        Self {
            nickname: Some(Some(nickname.into())),
            ..Default::default()
        }
    }

    pub fn snapshot(snapshot: WalletSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Default::default()
        }
    }

    pub fn apply_to(self, wallet: &mut Wallet) {
        if let Some(nickname) = self.nickname {
            wallet.nickname = normalize_nickname(nickname);
        }
        if let Some(color) = self.color {
            wallet.color = color;
        }
        if let Some(snapshot) = self.snapshot {
            wallet.snapshot = snapshot;
        }
    }
}

// Token directory models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Mint address
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(rename = "logoURI", default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// Price models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub price: f64,
    #[serde(default)]
    pub change_24h: Option<f64>,
}
