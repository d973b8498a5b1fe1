//! # Transaction Pool (Mempool)
//!
//! Queues validated, unconfirmed transactions awaiting block inclusion.
//!
//! ## Lifecycle
//!
//! ```text
//! submit ──validate──→ [POOLED] ──block accepted──→ [REMOVED]
//!                          ↑                            │
//!                          └──── tip displaced ─────────┘
//! ```
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Admit | `pool.add()` | Validate, then insert unless duplicate |
//! | Select | `pool.take(n)` | First `n` in arrival order, not removed |
//! | Include | `pool.remove_included()` | Drop the block's transactions |
//! | Reorg | `pool.readmit()` | Re-validate a displaced block's transactions |

pub mod domain;

pub use domain::{MempoolConfig, MempoolError, TransactionPool};
