//! Address parsing and structural validation.
//!
//! Every address that enters the builder as text passes through here before it
//! is used in a derivation or an account meta.

use crate::error::{Result, TokenPipelineError};
use std::str::FromStr;

/// Re-export the underlying Solana Pubkey type.
pub use solana_sdk::pubkey::Pubkey;

/// Extension trait for Pubkey to add validated constructors.
pub trait PubkeyExt {
    fn from_base58(address: &str) -> Result<Pubkey>;
    fn from_bytes_checked(bytes: &[u8]) -> Result<Pubkey>;
}

impl PubkeyExt for Pubkey {
    /// Create a Pubkey from a base58 string.
    fn from_base58(address: &str) -> Result<Pubkey> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(TokenPipelineError::validation("Address is empty"));
        }
        Pubkey::from_str(trimmed)
            .map_err(|e| TokenPipelineError::validation(format!("Invalid address {}: {}", address, e)))
    }

    /// Create a Pubkey from a byte slice with length validation.
    fn from_bytes_checked(bytes: &[u8]) -> Result<Pubkey> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            TokenPipelineError::validation(format!(
                "Invalid public key length: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Pubkey::from(array))
    }
}

/// Parse a named field, keeping the field name in the error message.
pub(crate) fn parse_field(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_base58(value)
        .map_err(|_| TokenPipelineError::validation(format!("Invalid {}: {}", field, value)))
}

/// Serde adapter that reads and writes a Pubkey as a base58 string.
pub mod serde_base58 {
    use super::{Pubkey, PubkeyExt};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
