//! Signing capability.
//!
//! The pipeline never holds the fee payer's key. It hands the serialized
//! envelope to a [`TransactionSigner`] (a browser wallet bridge, a hardware
//! wallet, a remote signer, or a local [`KeypairSigner`]) and gets signed
//! bytes back. Any error from the signer is reported as `SignerRejected`.

use crate::error::{Result, TokenPipelineError};
use crate::keypair::Keypair;
use crate::transaction::{Transaction, TransactionExt};

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_signer::Signer;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign a serialized transaction and return it re-serialized.
    ///
    /// This may wait on user interaction; a dismissed prompt is an error.
    async fn sign_transaction(&self, transaction: Vec<u8>) -> Result<Vec<u8>>;
}

/// Signs with a keypair held in memory.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        KeypairSigner { keypair }
    }

    /// Load a signer from a 64-byte Solana secret key (seed followed by public key),
    /// the layout of a CLI keypair file.
    pub fn from_solana_secret_key(secret_key: &[u8]) -> Result<Self> {
        if secret_key.len() != 64 {
            return Err(TokenPipelineError::Config(format!(
                "Solana secret key must be 64 bytes, got {}",
                secret_key.len()
            )));
        }
        let keypair = Keypair::try_from(secret_key)
            .map_err(|e| TokenPipelineError::Config(format!("Invalid keypair: {}", e)))?;
        Ok(KeypairSigner::new(keypair))
    }
}

/// Add `keypair`'s signature to an in-memory transaction.
pub fn sign_with_keypair(tx: &mut Transaction, keypair: &Keypair) -> Result<()> {
    let signature = keypair.sign_message(&tx.signable_payload());
    tx.add_signature(&keypair.pubkey(), signature.as_ref())
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: Vec<u8>) -> Result<Vec<u8>> {
        let mut tx = Transaction::from_bytes(&transaction)?;
        sign_with_keypair(&mut tx, &self.keypair)?;
        tx.to_bytes()
    }
}
