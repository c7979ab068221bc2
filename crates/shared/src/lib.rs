pub mod models;
pub mod error;
pub mod config;
pub mod format;
pub mod validation;

pub use error::{Error, Result};
pub use validation::is_valid_solana_address;
