//! token-pipeline: SPL token transaction assembly and submission.
//!
//! This crate turns a token [`Intent`] (create, transfer, delegate, burn, mint,
//! create holding account) into the ordered instructions of one atomic
//! transaction, then drives that transaction through signing, broadcast and
//! confirmation to a terminal result.
//!
//! # Architecture
//!
//! 1. **Instruction building** (`intent`, `instructions`, `amount`) - validates
//!    intents, derives holding accounts and emits instructions. Reads account
//!    existence from the network and nothing else.
//! 2. **Submission** (`submit`) - wraps instructions in an [`Envelope`], asks a
//!    [`TransactionSigner`] for a signature, broadcasts once and waits for
//!    confirmation with a deadline.
//!
//! The chain is reached only through the [`Network`] trait and keys only
//! through [`TransactionSigner`], so both halves run against in-memory fakes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use token_pipeline::{BuilderConfig, InstructionBuilder, Intent, PipelineConfig, SubmissionPipeline};
//!
//! let pipeline = SubmissionPipeline::connect(PipelineConfig::from_env()?)?;
//! let builder = InstructionBuilder::new(BuilderConfig::new(wallet.pubkey()));
//! let intent = Intent::from_json(r#"{"intentType":"transfer","receiver":"...","tokenAddress":"...","amount":"2"}"#)?;
//! let result = pipeline.execute(&builder, &intent, &wallet).await?;
//! ```

pub mod amount;
pub mod config;
mod error;
pub mod instructions;
pub mod intent;
pub mod keypair;
pub mod network;
pub mod parser;
pub mod pubkey;
pub mod signer;
pub mod submit;
pub mod transaction;

// Re-export core types at crate root
pub use amount::{to_base_units, TokenAmount};
pub use config::{BuilderConfig, Cluster, Commitment, PipelineConfig};
pub use error::{Result, TokenPipelineError};
pub use intent::{BuildResult, InstructionBuilder, Intent};
pub use keypair::Keypair;
pub use network::{ExpiryReference, Network, RpcNetwork, SignatureStatus};
pub use pubkey::{Pubkey, PubkeyExt};
pub use signer::{KeypairSigner, TransactionSigner};
pub use submit::{
    await_confirmation, ConfirmationStatus, Envelope, SubmissionPipeline, SubmissionResult,
};
pub use transaction::{Transaction, TransactionExt};
