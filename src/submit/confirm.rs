//! Waiting for a broadcast signature to reach the target commitment.

use crate::config::Commitment;
use crate::error::{Result, TokenPipelineError};
use crate::network::{Network, SignatureStatus};

use serde::Serialize;
use solana_signature::Signature;
use std::time::Duration;
use tracing::{debug, warn};

/// Commitment a successful submission reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationStatus {
    Confirmed,
    Finalized,
}

/// Poll `signature` until it satisfies `commitment`.
///
/// Returns `ChainRejected` when the network reports an execution failure and
/// `Expired` once the block height passes `last_valid_block_height` with the
/// signature still unseen, or when `deadline` elapses. Transient read failures
/// while polling are logged and polled through; the transaction may already
/// be in flight.
pub async fn await_confirmation<N: Network + ?Sized>(
    network: &N,
    signature: &Signature,
    last_valid_block_height: u64,
    commitment: Commitment,
    poll_interval: Duration,
    deadline: Duration,
) -> Result<ConfirmationStatus> {
    let poll = async {
        loop {
            match network.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(outcome) = resolve(status, commitment) {
                        return outcome;
                    }
                    debug!(%signature, "Not yet confirmed");
                }
                Ok(None) => debug!(%signature, "Signature not yet seen"),
                Err(e) => warn!(%signature, error = %e, "Signature status poll failed"),
            }

            match network.get_block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    // It may have landed in the last valid block after the read above.
                    match network.get_signature_status(signature).await {
                        Ok(Some(status)) => {
                            if let Some(outcome) = resolve(status, commitment) {
                                return outcome;
                            }
                            debug!(%signature, height, "Landed at expiry, awaiting commitment");
                        }
                        Ok(None) => {
                            return Err(TokenPipelineError::Expired {
                                last_valid_block_height,
                            });
                        }
                        Err(e) => warn!(%signature, error = %e, "Signature status poll failed"),
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(%signature, error = %e, "Block height poll failed"),
            }

            tokio::time::sleep(poll_interval).await;
        }
    };

    match tokio::time::timeout(deadline, poll).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%signature, ?deadline, "Confirmation deadline elapsed");
            Err(TokenPipelineError::Expired {
                last_valid_block_height,
            })
        }
    }
}

/// Terminal outcome for `status`, or `None` while it is still short of `commitment`.
fn resolve(status: SignatureStatus, commitment: Commitment) -> Option<Result<ConfirmationStatus>> {
    match status {
        SignatureStatus::Failed(err) => Some(Err(TokenPipelineError::ChainRejected(err))),
        SignatureStatus::Finalized => Some(Ok(ConfirmationStatus::Finalized)),
        status if status.satisfies(commitment) => Some(Ok(ConfirmationStatus::Confirmed)),
        _ => None,
    }
}
