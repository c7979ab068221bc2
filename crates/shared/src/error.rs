use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("Wallet already exists: {0}")]
    WalletAlreadyExists(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
