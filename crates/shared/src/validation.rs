use crate::{Error, Result};

pub const MIN_ADDRESS_LEN: usize = 32;
pub const MAX_ADDRESS_LEN: usize = 44;

/// Check that a string has the shape of a Solana address: 32 to 44
/// characters, all from the base58 alphabet.
///
/// Only the shape is checked. A string that passes may still not decode to
/// a 32-byte public key.
pub fn is_valid_solana_address(address: &str) -> bool {
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
        return false;
    }

    bs58::decode(address).into_vec().is_ok()
}

/// Same check as [`is_valid_solana_address`], as a `Result`.
pub fn validate_address(address: &str) -> Result<()> {
    if is_valid_solana_address(address) {
        Ok(())
    } else {
        Err(Error::InvalidWalletAddress(format!(
            "'{}' is not a base58 string of {}-{} characters",
            address, MIN_ADDRESS_LEN, MAX_ADDRESS_LEN
        )))
    }
}
