//! # Logistichain Test Suite
//!
//! Cross-crate tests for the consensus engine.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion: codec hashing, merkle roots, difficulty
//! └── src/
//!     ├── fixtures.rs   # test nodes, hand-sealed blocks, tracing setup
//!     └── integration/  # end-to-end flows
//!         ├── genesis_flow.rs
//!         ├── reorg_race.rs
//!         ├── pool_miner.rs
//!         ├── hot_restart.rs
//!         └── cancellation.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lc-tests
//! RUST_LOG=lc_consensus=debug cargo test -p lc-tests integration::reorg_race
//! cargo bench -p lc-tests
//! ```

pub mod fixtures;
