//! Domain layer for block production
//!
//! - miner: nonce search with cancellation and hot restart

mod miner;

pub use miner::*;
