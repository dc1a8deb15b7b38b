//! Network collaborator.
//!
//! The builder and the pipeline only ever talk to the chain through [`Network`],
//! so tests can substitute an in-memory ledger and production code uses
//! [`RpcNetwork`] over the nonblocking JSON-RPC client.

use crate::config::{Commitment, PipelineConfig};
use crate::error::{Result, TokenPipelineError};
use crate::transaction::TransactionExt;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use solana_signature::Signature;
use tracing::debug;

/// A recent block reference that bounds a transaction's lifetime.
///
/// The envelope is valid only while the chain's block height is at most
/// `last_valid_block_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl ExpiryReference {
    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

/// On-chain account snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Status of a submitted signature as last reported by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Processed,
    Confirmed,
    Finalized,
    /// Execution failed; carries the runtime error verbatim
    Failed(String),
}

impl SignatureStatus {
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        match (self, commitment) {
            (SignatureStatus::Finalized, _) => true,
            (SignatureStatus::Confirmed, Commitment::Confirmed) => true,
            _ => false,
        }
    }
}

#[async_trait]
pub trait Network: Send + Sync {
    /// Latest blockhash and the last block height at which it is accepted.
    async fn get_expiry_reference(&self) -> Result<ExpiryReference>;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.get_account(address).await?.is_some())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// Submit signed wire bytes once. Returns the transaction signature.
    async fn broadcast(&self, signed_transaction: &[u8]) -> Result<Signature>;

    /// `None` while the network has no record of the signature.
    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>>;

    async fn get_block_height(&self) -> Result<u64>;
}

/// [`Network`] over a JSON-RPC endpoint.
pub struct RpcNetwork {
    client: RpcClient,
    commitment: CommitmentConfig,
    skip_preflight: bool,
}

impl RpcNetwork {
    pub fn new(config: &PipelineConfig) -> Self {
        let commitment = config.commitment.to_commitment_config();
        RpcNetwork {
            client: RpcClient::new_with_commitment(config.rpc_url().to_string(), commitment),
            commitment,
            skip_preflight: config.skip_preflight,
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl Network for RpcNetwork {
    async fn get_expiry_reference(&self) -> Result<ExpiryReference> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(classify_client_error)?;
        debug!(%blockhash, last_valid_block_height, "Fetched latest blockhash");
        Ok(ExpiryReference {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(classify_client_error)?;
        Ok(response.value.map(|account| AccountInfo {
            lamports: account.lamports,
            owner: account.owner,
            data: account.data,
        }))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(classify_client_error)
    }

    async fn broadcast(&self, signed_transaction: &[u8]) -> Result<Signature> {
        let tx = Transaction::from_bytes(signed_transaction)?;
        let config = RpcSendTransactionConfig {
            skip_preflight: self.skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(&tx, config)
            .await
            .map_err(classify_client_error)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(classify_client_error)?;

        let Some(status) = response.value.into_iter().next().flatten() else {
            return Ok(None);
        };

        let status = if let Some(err) = &status.err {
            SignatureStatus::Failed(err.to_string())
        } else if status.satisfies_commitment(CommitmentConfig::finalized()) {
            SignatureStatus::Finalized
        } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
            SignatureStatus::Confirmed
        } else {
            SignatureStatus::Processed
        };
        Ok(Some(status))
    }

    async fn get_block_height(&self) -> Result<u64> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(classify_client_error)
    }
}

/// Split client failures into chain-side rejections and transport failures.
fn classify_client_error(err: ClientError) -> TokenPipelineError {
    match err.kind() {
        ClientErrorKind::TransactionError(tx_err) => {
            TokenPipelineError::ChainRejected(tx_err.to_string())
        }
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            message,
            data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            ..
        }) => {
            let mut payload = message.clone();
            if let Some(sim_err) = &simulation.err {
                payload.push_str(&format!(" ({:?})", sim_err));
            }
            if let Some(logs) = &simulation.logs {
                for line in logs {
                    payload.push('\n');
                    payload.push_str(line);
                }
            }
            TokenPipelineError::ChainRejected(payload)
        }
        _ => TokenPipelineError::Network(err.to_string()),
    }
}
