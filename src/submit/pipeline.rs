//! The submission pipeline: expiry fetch, envelope, signing, broadcast, confirmation.

use crate::config::PipelineConfig;
use crate::error::{Result, TokenPipelineError};
use crate::instructions;
use crate::intent::{Intent, InstructionBuilder};
use crate::keypair::Keypair;
use crate::network::{ExpiryReference, Network, RpcNetwork};
use crate::parser;
use crate::signer::TransactionSigner;

use super::confirm::{await_confirmation, ConfirmationStatus};
use super::envelope::Envelope;

use serde::Serialize;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_signature::Signature;
use tracing::{debug, info, warn};

/// Terminal outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    #[serde(serialize_with = "serialize_signature")]
    pub signature: Signature,
    pub status: ConfirmationStatus,
}

fn serialize_signature<S: serde::Serializer>(
    signature: &Signature,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(signature)
}

/// Drives one envelope per call from instructions to a terminal result.
///
/// Holds no state between calls, so concurrent submissions are independent.
pub struct SubmissionPipeline<N> {
    network: N,
    config: PipelineConfig,
}

impl SubmissionPipeline<RpcNetwork> {
    /// Pipeline over the JSON-RPC endpoint named by `config`.
    pub fn connect(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let network = RpcNetwork::new(&config);
        Ok(SubmissionPipeline { network, config })
    }
}

impl<N: Network> SubmissionPipeline<N> {
    pub fn new(network: N, config: PipelineConfig) -> Self {
        SubmissionPipeline { network, config }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Submit `instructions` with a freshly fetched expiry reference.
    ///
    /// `local_signers` co-sign before the external signer sees the envelope.
    pub async fn submit<S: TransactionSigner + ?Sized>(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        signer: &S,
        local_signers: &[&Keypair],
    ) -> Result<SubmissionResult> {
        check_request(instructions, fee_payer, signer)?;
        let expiry = self.network.get_expiry_reference().await?;
        debug!(
            blockhash = %expiry.blockhash,
            last_valid_block_height = expiry.last_valid_block_height,
            "Expiry reference fetched"
        );
        self.submit_with_expiry(instructions, expiry, fee_payer, signer, local_signers)
            .await
    }

    /// Submit against a caller-supplied expiry reference.
    pub async fn submit_with_expiry<S: TransactionSigner + ?Sized>(
        &self,
        instructions: &[Instruction],
        expiry: ExpiryReference,
        fee_payer: &Pubkey,
        signer: &S,
        local_signers: &[&Keypair],
    ) -> Result<SubmissionResult> {
        check_request(instructions, fee_payer, signer)?;

        let mut all_instructions = Vec::with_capacity(instructions.len() + 1);
        if let Some(price) = self.config.compute_unit_price {
            all_instructions.push(instructions::set_compute_unit_price(price));
        }
        all_instructions.extend_from_slice(instructions);

        let mut envelope = Envelope::new(&all_instructions, fee_payer, expiry)?;
        for keypair in local_signers {
            envelope.partial_sign(keypair)?;
        }
        debug!(
            %fee_payer,
            instructions = ?parser::describe(&all_instructions),
            "Envelope assembled"
        );

        // Do not prompt the signer for an envelope that can no longer land.
        self.ensure_not_expired(&expiry).await?;

        let unsigned = envelope.to_bytes()?;
        let signed = signer.sign_transaction(unsigned).await.map_err(|e| match e {
            TokenPipelineError::SignerRejected(_) => e,
            other => TokenPipelineError::SignerRejected(other.to_string()),
        });
        let signed = match signed {
            Ok(signed) => signed,
            Err(e) => {
                warn!(%fee_payer, error = %e, "Signer rejected envelope");
                return Err(e);
            }
        };
        envelope.accept_signed(&signed)?;
        debug!(signature = %envelope.signature(), "Envelope signed");

        // Signing may have taken longer than the remaining window.
        self.ensure_not_expired(&expiry).await?;

        let bytes = envelope.to_bytes()?;
        let signature = match self.network.broadcast(&bytes).await {
            Ok(signature) => signature,
            Err(e) => {
                warn!(signature = %envelope.signature(), error = %e, "Broadcast failed");
                return Err(e);
            }
        };
        info!(%signature, "Transaction broadcast");

        let status = await_confirmation(
            &self.network,
            &signature,
            expiry.last_valid_block_height,
            self.config.commitment,
            self.config.poll_interval(),
            self.config.confirm_timeout(),
        )
        .await
        .inspect_err(|e| warn!(%signature, error = %e, "Transaction did not confirm"))?;

        info!(%signature, ?status, "Transaction confirmed");
        Ok(SubmissionResult { signature, status })
    }

    /// Build `intent` with `builder` and submit it, fee paid by the builder's owner.
    pub async fn execute<S: TransactionSigner + ?Sized>(
        &self,
        builder: &InstructionBuilder,
        intent: &Intent,
        signer: &S,
    ) -> Result<SubmissionResult> {
        let built = builder.build(&self.network, intent).await?;
        let local_signers = built.local_signers();
        self.submit(&built.instructions, &builder.owner(), signer, &local_signers)
            .await
    }

    async fn ensure_not_expired(&self, expiry: &ExpiryReference) -> Result<()> {
        let height = self.network.get_block_height().await?;
        if expiry.is_expired_at(height) {
            warn!(
                block_height = height,
                last_valid_block_height = expiry.last_valid_block_height,
                "Expiry reference elapsed before broadcast"
            );
            return Err(TokenPipelineError::Expired {
                last_valid_block_height: expiry.last_valid_block_height,
            });
        }
        Ok(())
    }
}

/// Reject a submission the signer could never complete, before any network read.
fn check_request<S: TransactionSigner + ?Sized>(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    signer: &S,
) -> Result<()> {
    if instructions.is_empty() {
        return Err(TokenPipelineError::validation(
            "Cannot submit an empty instruction list",
        ));
    }
    let signer_key = signer.pubkey();
    if signer_key != *fee_payer {
        return Err(TokenPipelineError::SignerRejected(format!(
            "Signer {} cannot sign for fee payer {}",
            signer_key, fee_payer
        )));
    }
    Ok(())
}
