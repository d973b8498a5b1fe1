//! Error types for block production

use lc_consensus::{ConsensusError, DifficultyError};
use shared_types::ModelError;
use thiserror::Error;

/// Result type alias for block production operations
pub type MiningResult<T> = std::result::Result<T, MiningError>;

/// Errors that end a nonce search
#[derive(Debug, Error)]
pub enum MiningError {
    /// The cancellation flag was raised
    #[error("mining cancelled")]
    Cancelled,

    /// Every nonce above the starting nonce was tried
    #[error("nonce space exhausted")]
    NonceLimitReached,

    /// The requested difficulty has no usable target
    #[error("difficulty error: {0}")]
    Difficulty(#[from] DifficultyError),

    /// A candidate was rejected for a reason another nonce cannot fix
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("model error: {0}")]
    Model(ModelError),
}

impl MiningError {
    /// True when mining can simply start over with a fresh candidate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonceLimitReached)
    }
}

impl From<ModelError> for MiningError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::NonceLimitReached => Self::NonceLimitReached,
            other => Self::Model(other),
        }
    }
}
