//! Mempool error types.

use lc_consensus::TransactionRejected;
use thiserror::Error;

/// Why a transaction was not admitted.
#[derive(Debug, Clone, Error)]
pub enum MempoolError {
    /// Transaction already exists in the pool.
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(String),

    /// Pool has reached maximum capacity.
    #[error("pool full (capacity {capacity})")]
    PoolFull { capacity: usize },

    /// Transaction failed validation.
    #[error(transparent)]
    Rejected(#[from] TransactionRejected),
}

impl MempoolError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateTransaction(_))
    }
}
