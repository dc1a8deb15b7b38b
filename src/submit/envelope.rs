//! The transaction envelope owned by one submission.

use crate::error::{Result, TokenPipelineError};
use crate::keypair::Keypair;
use crate::network::ExpiryReference;
use crate::signer::sign_with_keypair;
use crate::transaction::{Transaction, TransactionExt};

use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;

/// Instructions, fee payer and expiry reference, compiled into a legacy transaction.
///
/// Instruction order is preserved exactly as given.
#[derive(Debug)]
pub struct Envelope {
    transaction: Transaction,
    expiry: ExpiryReference,
}

impl Envelope {
    pub fn new(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        expiry: ExpiryReference,
    ) -> Result<Envelope> {
        if instructions.is_empty() {
            return Err(TokenPipelineError::validation(
                "Cannot submit an empty instruction list",
            ));
        }
        let message = Message::new_with_blockhash(instructions, Some(fee_payer), &expiry.blockhash);
        Ok(Envelope {
            transaction: Transaction::new_unsigned(message),
            expiry,
        })
    }

    pub fn expiry(&self) -> &ExpiryReference {
        &self.expiry
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.transaction.fee_payer()
    }

    /// Sign with a locally held keypair. Keypairs that are not required
    /// signers of the message are skipped.
    pub fn partial_sign(&mut self, keypair: &Keypair) -> Result<bool> {
        if self.transaction.signer_index(&keypair.pubkey()).is_none() {
            return Ok(false);
        }
        sign_with_keypair(&mut self.transaction, keypair)?;
        Ok(true)
    }

    /// Wire bytes handed to the external signer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.transaction.to_bytes()
    }

    /// Replace the transaction with the signer's output.
    ///
    /// The signed bytes must decode, carry the same message, and hold a valid
    /// signature for every required signer.
    pub fn accept_signed(&mut self, signed: &[u8]) -> Result<()> {
        let signed = Transaction::from_bytes(signed).map_err(|e| {
            TokenPipelineError::SignerRejected(format!("Signer returned undecodable bytes: {}", e))
        })?;

        if signed.message != self.transaction.message {
            return Err(TokenPipelineError::SignerRejected(
                "Signer modified the transaction message".to_string(),
            ));
        }

        let num_signers = signed.message.header.num_required_signatures as usize;
        for key in signed.message.account_keys.iter().take(num_signers) {
            if !signed.has_valid_signature(key) {
                return Err(TokenPipelineError::SignerRejected(format!(
                    "Missing or invalid signature for {}",
                    key
                )));
            }
        }

        self.transaction = signed;
        Ok(())
    }

    /// The fee payer's signature, which identifies the transaction on-chain.
    pub fn signature(&self) -> Signature {
        self.transaction
            .signatures
            .first()
            .copied()
            .unwrap_or_default()
    }
}
