use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Failure kinds surfaced by the instruction builder and the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenPipelineError {
    /// Malformed address, non-positive or unrepresentable amount, empty instruction list.
    /// Detected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A holding account the operation depends on does not exist on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Transport or RPC failure. Safe to retry the whole call from the top.
    #[error("Network error: {0}")]
    Network(String),

    /// The signer declined or was unavailable
    #[error("Signer rejected: {0}")]
    SignerRejected(String),

    /// The expiry window elapsed before confirmation. Rebuild with a fresh
    /// expiry reference; resubmitting the same envelope can never succeed.
    #[error("Transaction expired: block height exceeded {last_valid_block_height}")]
    Expired { last_valid_block_height: u64 },

    /// Simulation or execution failure reported by the network, verbatim
    #[error("Rejected by chain: {0}")]
    ChainRejected(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TokenPipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TokenPipelineError::Validation(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        TokenPipelineError::Network(msg.into())
    }

    /// Only transport failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenPipelineError::Network(_))
    }

    /// True when the caller has to rebuild the envelope with a fresh expiry reference.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, TokenPipelineError::Expired { .. })
    }
}

impl From<bincode::Error> for TokenPipelineError {
    fn from(err: bincode::Error) -> Self {
        TokenPipelineError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TokenPipelineError {
    fn from(err: serde_json::Error) -> Self {
        TokenPipelineError::Serialization(err.to_string())
    }
}

/// Result type alias for builder and pipeline operations
pub type Result<T> = std::result::Result<T, TokenPipelineError>;
