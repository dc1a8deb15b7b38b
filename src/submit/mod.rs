//! Transaction submission.
//!
//! ```text
//! instructions ─► Envelope ─► local signers ─► TransactionSigner ─► broadcast ─► await_confirmation
//! ```
//!
//! Each call is one attempt with one confirmation wait. Nothing is shared
//! between calls.

mod confirm;
mod envelope;
mod pipeline;

pub use confirm::{await_confirmation, ConfirmationStatus};
pub use envelope::Envelope;
pub use pipeline::{SubmissionPipeline, SubmissionResult};
