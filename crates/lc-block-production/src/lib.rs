//! # lc-block-production
//!
//! Proof-of-work block production for Logistichain.
//!
//! ## Purpose
//!
//! - **BlockCreator**: nonce search over a candidate block. Each sealed
//!   attempt goes through the block validator, which appends it on success.
//! - **MiningService**: the node-level loop. It assembles coinbase plus pool
//!   entries, mines on a dedicated thread, accepts blocks from elsewhere and
//!   keeps the pool and the persisted chain in step with the tip.
//!
//! ## Concurrency
//!
//! | Concern       | Mechanism                                           |
//! |---------------|-----------------------------------------------------|
//! | Cancellation  | `AtomicBool`, checked before every nonce            |
//! | Hot restart   | `TipWatch` generation, bumped on every chain write  |
//! | Tip races     | validator decides and writes under one chain lock   |
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use lc_block_production::{MinerConfig, MiningDependencies, MiningService};
//!
//! let service = Arc::new(MiningService::new(deps, MinerConfig::new(pk, sk))?);
//! service.start();
//! service.submit_transaction(tx);
//! service.submit_block(block_from_peer)?;
//! service.stop();
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::MinerConfig;
pub use domain::{BlockCreator, BlockRequest, MinedBlock};
pub use error::{MiningError, MiningResult};
pub use service::{MiningDependencies, MiningService, MiningStatus};
