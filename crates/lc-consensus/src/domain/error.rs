//! Error types for the consensus crate
//!
//! Rejections are data: they carry the offending block or transaction and a
//! typed reason whose `Display` text is stable.

use shared_types::{Block, ModelError, Transaction, TransactionAction};
use thiserror::Error;

/// Why a block was rejected, in validation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejection {
    #[error("network id mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: String, actual: String },

    #[error("block header is not finalized")]
    NotFinalized,

    #[error("block hash is incorrect: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("block hash has no leading zero")]
    NoLeadingZero,

    #[error("block hash does not meet the target")]
    TargetNotMet,

    #[error("timestamp {timestamp} is more than {max_offset}s away from now ({now})")]
    TimestampOutOfRange {
        timestamp: i64,
        now: i64,
        max_offset: i64,
    },

    #[error("block contains no transactions")]
    NoTransactions,

    #[error("merkle root is incorrect: expected {expected}, got {actual}")]
    MerkleRootMismatch { expected: String, actual: String },

    #[error("first transaction is not a coinbase claim")]
    FirstTransactionNotCoinbase,

    #[error("block contains more than one coinbase claim")]
    MultipleCoinbase,

    #[error("block signature is invalid")]
    InvalidSignature,

    #[error("block has no previous hash but the chain is not empty")]
    MissingPreviousHash,

    #[error("previous block {0} does not exist in the chain")]
    UnknownPreviousBlock(String),

    #[error("chain split is not supported")]
    ChainSplitNotSupported,

    #[error("block has a higher difficulty value than the current tip {incumbent}")]
    HigherDifficulty { incumbent: String },
}

impl BlockRejection {
    /// Rejections a miner should answer with the next nonce.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoLeadingZero | Self::TargetNotMet)
    }
}

/// A rejected block with its reason.
#[derive(Debug, Clone, Error)]
#[error("block {} rejected: {reason}", block.hash())]
pub struct BlockRejected {
    pub block: Box<Block>,
    pub reason: BlockRejection,
}

impl BlockRejected {
    pub fn new(block: &Block, reason: BlockRejection) -> Self {
        Self {
            block: Box::new(block.clone()),
            reason,
        }
    }
}

/// Why a transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionRejection {
    #[error("transaction is not of type StateTransaction")]
    NotStateTransaction,

    #[error("unsupported transaction version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    #[error("transaction is not finalized")]
    NotFinalized,

    #[error("transaction hash is incorrect: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("transaction is already on the chain in block {block_hash}")]
    AlreadyOnChain { block_hash: String },

    #[error("transaction appears more than once")]
    Duplicate,

    #[error("field {0} must be empty for this action")]
    UnexpectedField(&'static str),

    #[error("field {0} is required for this action")]
    MissingField(&'static str),

    #[error("fee {actual} is below the minimum of {minimum}")]
    FeeTooLow { minimum: u64, actual: u64 },

    #[error("amount {actual} is below the minimum of {minimum}")]
    AmountTooLow { minimum: u64, actual: u64 },

    #[error("coinbase amount {actual} exceeds the reward of {reward}")]
    RewardTooHigh { reward: u64, actual: u64 },

    #[error("invalid SKU data: {0}")]
    InvalidSkuData(String),

    #[error("referenced SKU {block_hash}#{tx_index} not found")]
    SkuNotFound { block_hash: String, tx_index: u32 },

    #[error("referenced transaction {block_hash}#{tx_index} is not a SKU creation")]
    NotASkuCreation { block_hash: String, tx_index: u32 },

    #[error("sender does not own the referenced SKU")]
    NotSkuOwner,

    #[error("insufficient token balance: required {required}, available {available}")]
    InsufficientTokenBalance { required: u64, available: u64 },

    #[error("insufficient supply: required {required}, available {available}")]
    InsufficientSupply { required: u64, available: u64 },

    #[error("action {0} is not implemented")]
    ActionNotImplemented(TransactionAction),

    #[error("unknown transaction action")]
    UnknownAction,

    #[error("signing key is empty")]
    EmptySigningKey,

    #[error("transaction signature is invalid")]
    InvalidSignature,

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),
}

/// A rejected transaction with its reason.
#[derive(Debug, Clone, Error)]
#[error("transaction {} rejected: {reason}", transaction.hash())]
pub struct TransactionRejected {
    pub transaction: Box<Transaction>,
    pub reason: TransactionRejection,
}

impl TransactionRejected {
    pub fn new(transaction: &Transaction, reason: TransactionRejection) -> Self {
        Self {
            transaction: Box::new(transaction.clone()),
            reason,
        }
    }
}

/// Difficulty calculation failures. Fatal to the calling operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("not enough history at height {height} for epoch length {epoch_length}")]
    InsufficientHistory { height: u64, epoch_length: u64 },
}

/// Umbrella error for consensus operations.
#[derive(Debug, Clone, Error)]
pub enum ConsensusError {
    #[error(transparent)]
    Block(#[from] BlockRejected),

    #[error(transparent)]
    Transaction(#[from] TransactionRejected),

    #[error(transparent)]
    Difficulty(#[from] DifficultyError),

    #[error("cannot compute a merkle root over an empty transaction set")]
    EmptyTransactionSet,

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ConsensusError {
    /// The block rejection reason, if this is a block rejection.
    pub fn block_rejection(&self) -> Option<&BlockRejection> {
        match self {
            Self::Block(rejected) => Some(&rejected.reason),
            _ => None,
        }
    }

    /// The transaction rejection reason, if this is a transaction rejection.
    pub fn transaction_rejection(&self) -> Option<&TransactionRejection> {
        match self {
            Self::Transaction(rejected) => Some(&rejected.reason),
            _ => None,
        }
    }

    /// True for the rejections expected during nonce search.
    pub fn is_retryable(&self) -> bool {
        self.block_rejection()
            .map(BlockRejection::is_retryable)
            .unwrap_or(false)
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
