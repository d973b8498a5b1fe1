//! # lc-consensus
//!
//! Proof-of-work consensus rules for Logistichain.
//!
//! ## Architecture
//!
//! - **domain**: codec, difficulty, transaction and block validation. Pure
//!   logic; the outside world is reached only through ports.
//! - **ports**: `Signer`, `Timestamper`, `ChainRepository` and the ledger
//!   readers.
//! - **adapters**: in-process implementations of the ports.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lc_consensus::adapters::{in_memory_dependencies, InMemoryChainRepository, SystemTimestamper};
//! use lc_consensus::{BlockValidator, ConsensusConfig};
//!
//! let chain = Chain::new("testnet").into_shared();
//! let repository = Arc::new(InMemoryChainRepository::with_chain(chain.clone()));
//! let validator = BlockValidator::new(
//!     Arc::new(ConsensusConfig::default()),
//!     in_memory_dependencies(repository),
//!     Arc::new(SystemTimestamper),
//! );
//!
//! let acceptance = validator.validate_block(&block, target, &chain, true, true)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use config::{ConfigError, ConsensusConfig, FeeSchedule, NetworkParams};
pub use domain::{
    codec, merkle_root, BlockAcceptance, BlockDifficultyUpdate, BlockRejected, BlockRejection,
    BlockValidator, Commitments, ConsensusError, ConsensusResult, Difficulty, DifficultyCalculator,
    DifficultyError, KeyPair, SkuRef, TipWatch, TransactionCreator, TransactionRejected,
    TransactionRejection, TransactionValidator, ValidatorDependencies,
};
pub use ports::{ChainRepository, Signer, SkuLedgerReader, Timestamper, TokenLedgerReader};
