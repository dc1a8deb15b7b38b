//! Intent-based instruction building.
//!
//! An [`Intent`] names one token operation; [`InstructionBuilder`] turns it
//! into the ordered instructions of a single atomic transaction.
//!
//! ```rust,ignore
//! let builder = InstructionBuilder::new(BuilderConfig::new(owner));
//! let result = builder.build(&network, &intent).await?;
//! // result.instructions - ordered instructions
//! // result.generated_keypairs - mint keypair for createToken, must co-sign
//! ```

mod build;
mod types;

pub use build::InstructionBuilder;
pub use types::*;
