//! # Shared Types Crate
//!
//! Domain entities shared by the consensus, mempool and block production
//! crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks, transactions and the chain are
//!   defined once, here.
//! - **Seal Once**: headers and transactions carry a [`Seal`] that can be
//!   finalized exactly once; the nonce only moves while the seal is open.
//! - **Explicit Sharing**: the chain is shared as [`SharedChain`], never
//!   through a global.

pub mod chain;
pub mod entities;
pub mod errors;
pub mod sku;

pub use chain::*;
pub use entities::*;
pub use errors::*;
pub use sku::*;
