//! Domain layer for consensus
//!
//! - codec: canonical encoding and hashing
//! - difficulty: epoch-based difficulty and targets
//! - transaction_validation: per-action transaction rules, merkle roots
//! - block_validation: block checks and tip selection
//! - transaction_creator: building sealed transactions

pub mod codec;
mod block_validation;
mod difficulty;
mod error;
mod transaction_creator;
mod transaction_validation;

pub use block_validation::*;
pub use difficulty::*;
pub use error::*;
pub use transaction_creator::*;
pub use transaction_validation::*;
