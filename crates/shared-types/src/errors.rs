//! # Error Types
//!
//! Defines error types used across crates.

use thiserror::Error;

/// Violations of the entity state machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// `finalize` called on an already sealed header or transaction.
    #[error("already finalized")]
    AlreadyFinalized,

    /// The nonce cannot be incremented past `u64::MAX`.
    #[error("nonce limit reached")]
    NonceLimitReached,
}

/// Errors surfaced by chain repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Requested chain, block or transaction does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store could not be reached.
    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
