pub mod client;
pub mod types;

pub use client::{SolanaRpc, SolanaRpcClient};
pub use types::SPL_TOKEN_PROGRAM_ID;
