//! Solana transaction serialization and signature manipulation.
//!
//! # Wire Format
//!
//! Legacy transactions are a compact-array of signatures followed by the
//! message (header, account keys, recent blockhash, compiled instructions).
//! The bytes handed to the signer and to the network are the bincode
//! encoding of the whole transaction.

use crate::error::{Result, TokenPipelineError};
use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use solana_signature::Signature;

/// Re-export the underlying Solana Transaction type.
pub use solana_transaction::Transaction;

pub trait TransactionExt {
    /// Deserialize a transaction from raw bytes (wire format).
    fn from_bytes(bytes: &[u8]) -> Result<Transaction>;

    fn from_base64(encoded: &str) -> Result<Transaction>;

    /// Serialize transaction to bytes (wire format).
    fn to_bytes(&self) -> Result<Vec<u8>>;

    fn to_base64(&self) -> Result<String>;

    fn fee_payer(&self) -> Option<Pubkey>;

    /// Get the signable message bytes (what gets signed).
    fn signable_payload(&self) -> Vec<u8>;

    /// Index of `pubkey` among the required signers.
    fn signer_index(&self, pubkey: &Pubkey) -> Option<usize>;

    /// Place a signature for a given signer.
    ///
    /// The pubkey must be one of the required signers in the transaction.
    fn add_signature(&mut self, pubkey: &Pubkey, signature: &[u8]) -> Result<()>;

    /// True when `pubkey` has a signature that verifies against the message.
    fn has_valid_signature(&self, pubkey: &Pubkey) -> bool;
}

impl TransactionExt for Transaction {
    fn from_bytes(bytes: &[u8]) -> Result<Transaction> {
        bincode::deserialize(bytes).map_err(|e| {
            TokenPipelineError::Serialization(format!("Failed to deserialize transaction: {}", e))
        })
    }

    fn from_base64(encoded: &str) -> Result<Transaction> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| TokenPipelineError::Serialization(format!("Invalid base64: {}", e)))?;
        Transaction::from_bytes(&bytes)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            TokenPipelineError::Serialization(format!("Failed to serialize transaction: {}", e))
        })
    }

    fn to_base64(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_bytes()?))
    }

    fn fee_payer(&self) -> Option<Pubkey> {
        self.message.account_keys.first().copied()
    }

    fn signable_payload(&self) -> Vec<u8> {
        self.message.serialize()
    }

    fn signer_index(&self, pubkey: &Pubkey) -> Option<usize> {
        let num_signers = self.message.header.num_required_signatures as usize;
        self.message
            .account_keys
            .iter()
            .take(num_signers)
            .position(|key| key == pubkey)
    }

    fn add_signature(&mut self, pubkey: &Pubkey, signature_bytes: &[u8]) -> Result<()> {
        let bytes: [u8; 64] = signature_bytes.try_into().map_err(|_| {
            TokenPipelineError::validation(format!(
                "Invalid signature length: expected 64 bytes, got {}",
                signature_bytes.len()
            ))
        })?;

        let signer_idx = self
            .signer_index(pubkey)
            .ok_or_else(|| TokenPipelineError::validation(format!("unknown signer: {}", pubkey)))?;

        let num_signers = self.message.header.num_required_signatures as usize;
        if self.signatures.len() < num_signers {
            self.signatures.resize(num_signers, Signature::default());
        }

        self.signatures[signer_idx] = Signature::from(bytes);
        Ok(())
    }

    fn has_valid_signature(&self, pubkey: &Pubkey) -> bool {
        let Some(idx) = self.signer_index(pubkey) else {
            return false;
        };
        let Some(signature) = self.signatures.get(idx) else {
            return false;
        };
        *signature != Signature::default()
            && signature.verify(pubkey.as_ref(), &self.signable_payload())
    }
}
