pub mod logging;
pub mod price_service;
pub mod token_metadata_service;
pub mod wallet_service;

pub use price_service::{
    price_source_from_config, JupiterPriceSource, NoopPriceSource, PriceSource,
};
pub use token_metadata_service::{TokenCacheSnapshot, TokenMetadataService};
pub use wallet_service::{AddWalletStage, RefreshReport, WalletService};
