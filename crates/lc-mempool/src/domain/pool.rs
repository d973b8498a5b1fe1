//! # Transaction Pool
//!
//! Validated transactions awaiting inclusion, in arrival order.
//!
//! ## Invariants
//!
//! - No duplicate hashes: the duplicate check and the insert happen under
//!   one lock.
//! - Only transactions that passed validation against the current chain
//!   are admitted, with every pooled entry's spending already deducted.
//!   Admissions are serialised so two entries never spend the same funds.
//! - Entries leave the pool when a block including them is accepted.

use super::errors::MempoolError;
use lc_consensus::{Commitments, TransactionValidator};
use parking_lot::Mutex;
use serde::Deserialize;
use shared_types::{Block, Transaction};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Pool configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of pooled transactions.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    /// Arrival order.
    ordered: Vec<Transaction>,
    by_hash: HashSet<String>,
}

impl PoolState {
    fn remove(&mut self, hash: &str) -> bool {
        if !self.by_hash.remove(hash) {
            return false;
        }
        self.ordered.retain(|tx| tx.hash() != hash);
        true
    }
}

/// Thread-safe pool shared between intake and the miner.
pub struct TransactionPool {
    config: MempoolConfig,
    net_id: String,
    validator: TransactionValidator,
    state: Mutex<PoolState>,
    /// Held from validation to insert.
    admission: Mutex<()>,
}

impl TransactionPool {
    /// Creates an empty pool validating against the ledger of `net_id`.
    pub fn new(validator: TransactionValidator, net_id: impl Into<String>) -> Self {
        Self::with_config(validator, net_id, MempoolConfig::default())
    }

    pub fn with_config(
        validator: TransactionValidator,
        net_id: impl Into<String>,
        config: MempoolConfig,
    ) -> Self {
        Self {
            config,
            net_id: net_id.into(),
            validator,
            state: Mutex::new(PoolState::default()),
            admission: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Admit a transaction. Duplicates and invalid transactions are logged
    /// and dropped.
    pub fn add(&self, tx: Transaction) -> bool {
        match self.try_add(tx) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Transaction not admitted to pool");
                false
            }
        }
    }

    /// Admit a transaction, reporting why it was not admitted.
    pub fn try_add(&self, tx: Transaction) -> Result<(), MempoolError> {
        let _admission = self.admission.lock();
        let committed = {
            let state = self.state.lock();
            if state.by_hash.contains(tx.hash()) {
                return Err(MempoolError::DuplicateTransaction(tx.hash().to_string()));
            }
            state.ordered.iter().collect::<Commitments>()
        };

        // Ledger reads happen outside the state lock.
        self.validator
            .validate_against(&tx, &self.net_id, &committed)?;

        let mut state = self.state.lock();
        if state.ordered.len() >= self.config.max_transactions {
            return Err(MempoolError::PoolFull {
                capacity: self.config.max_transactions,
            });
        }

        debug!(hash = tx.hash(), action = %tx.action(), "Transaction admitted");
        state.by_hash.insert(tx.hash().to_string());
        state.ordered.push(tx);
        Ok(())
    }

    pub fn remove(&self, tx: &Transaction) -> bool {
        self.state.lock().remove(tx.hash())
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.contains_hash(tx.hash())
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.state.lock().by_hash.contains(hash)
    }

    /// Snapshot of all pooled transactions in arrival order.
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.state.lock().ordered.clone()
    }

    /// The first `n` transactions in arrival order. They stay pooled.
    pub fn take(&self, n: usize) -> Vec<Transaction> {
        self.state.lock().ordered.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every transaction included in an accepted block.
    pub fn remove_included(&self, block: &Block) -> usize {
        let mut state = self.state.lock();
        let removed = block
            .transactions
            .iter()
            .filter(|tx| state.remove(tx.hash()))
            .count();
        if removed > 0 {
            debug!(removed, block = block.hash(), "Removed included transactions");
        }
        removed
    }

    /// Re-admit the transactions of a displaced block. Coinbase claims are
    /// skipped; the rest are validated again.
    pub fn readmit(&self, transactions: impl IntoIterator<Item = Transaction>) -> usize {
        transactions
            .into_iter()
            .filter(|tx| !tx.is_coinbase())
            .filter(|tx| self.add(tx.clone()))
            .count()
    }
}

impl std::fmt::Debug for TransactionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPool")
            .field("net_id", &self.net_id)
            .field("len", &self.len())
            .finish()
    }
}
