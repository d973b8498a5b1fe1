//! Transaction validation and merkle roots
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the transaction is a state transaction
//! 2. its version is the configured transaction version
//! 3. it is finalized and its recorded hash matches the codec hash
//! 4. it is not already on the chain, nor earlier in the same set
//! 5. the per-action rules (field presence, fees, amounts, balances, SKU
//!    references)
//! 6. its signature verifies against the signing key (`to` for a coinbase
//!    claim, `from` otherwise)
//!
//! Balances are read from the chain ledger minus what [`Commitments`]
//! records as already spent by unconfirmed transactions ahead of this one.

use super::codec;
use super::error::{ConsensusError, ConsensusResult, TransactionRejected, TransactionRejection};
use crate::config::ConsensusConfig;
use crate::ports::{ChainRepository, Signer, SkuLedgerReader, TokenLedgerReader};
use shared_types::{
    Block, RepositoryError, SkuData, StateTransaction, Transaction, TransactionAction,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

type Check<T = ()> = Result<T, TransactionRejection>;

/// Spending by transactions that are ordered ahead of the one being
/// validated but are not on the chain yet: earlier entries of the same
/// block, or of the pool.
///
/// Only debits are tracked. Funds received inside the same set are not
/// spendable until they are confirmed.
#[derive(Debug, Clone, Default)]
pub struct Commitments {
    parent: Option<String>,
    hashes: HashSet<String>,
    tokens: HashMap<String, u64>,
    supply: HashMap<(String, String, u32), u64>,
}

impl Commitments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commitments of a block built on `parent`. A transaction found only
    /// in another child of `parent` is not a replay: that child is the tip
    /// this block may replace.
    pub fn for_block(parent: Option<&str>) -> Self {
        Self {
            parent: parent.map(String::from),
            ..Self::default()
        }
    }

    /// Record what `tx` spends.
    pub fn record(&mut self, tx: &Transaction) {
        self.hashes.insert(tx.hash().to_string());
        let Some(state) = tx.as_state() else {
            return;
        };
        let Some(from) = state.from_pub_key.as_deref() else {
            return;
        };

        let mut spent = state.base.fee;
        match state.base.action {
            TransactionAction::TransferToken => spent = spent.saturating_add(state.amount),
            TransactionAction::TransferSupply | TransactionAction::DestroySupply => {
                if let Some(sku) = state.sku_block_hash.as_deref() {
                    let key = (from.to_string(), sku.to_string(), state.sku_tx_index);
                    let units = self.supply.entry(key).or_default();
                    *units = units.saturating_add(state.amount);
                }
            }
            _ => {}
        }
        let tokens = self.tokens.entry(from.to_string()).or_default();
        *tokens = tokens.saturating_add(spent);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    fn is_sibling(&self, block: &Block) -> bool {
        self.parent.is_some() && block.header.previous_hash == self.parent
    }

    pub fn tokens(&self, key: &str) -> u64 {
        self.tokens.get(key).copied().unwrap_or(0)
    }

    pub fn supply(&self, key: &str, sku_block_hash: &str, sku_tx_index: u32) -> u64 {
        self.supply
            .get(&(key.to_string(), sku_block_hash.to_string(), sku_tx_index))
            .copied()
            .unwrap_or(0)
    }
}

impl<'a> FromIterator<&'a Transaction> for Commitments {
    fn from_iter<I: IntoIterator<Item = &'a Transaction>>(iter: I) -> Self {
        let mut commitments = Self::new();
        for tx in iter {
            commitments.record(tx);
        }
        commitments
    }
}

/// Flat merkle root: the encodings of all transactions (the last one twice
/// when the count is odd) hashed in one pass.
pub fn merkle_root(transactions: &[Transaction]) -> ConsensusResult<String> {
    let last = transactions
        .last()
        .ok_or(ConsensusError::EmptyTransactionSet)?;

    let mut bytes = Vec::with_capacity(transactions.len() * 128);
    for tx in transactions {
        bytes.extend_from_slice(&codec::transaction_bytes(tx));
    }
    if transactions.len() % 2 == 1 {
        bytes.extend_from_slice(&codec::transaction_bytes(last));
    }
    Ok(codec::hash_hex(&bytes))
}

/// Outbound ports shared by the validators.
#[derive(Clone)]
pub struct ValidatorDependencies {
    pub signer: Arc<dyn Signer>,
    pub repository: Arc<dyn ChainRepository>,
    pub tokens: Arc<dyn TokenLedgerReader>,
    pub skus: Arc<dyn SkuLedgerReader>,
}

#[derive(Clone)]
pub struct TransactionValidator {
    config: Arc<ConsensusConfig>,
    deps: ValidatorDependencies,
}

impl TransactionValidator {
    pub fn new(config: Arc<ConsensusConfig>, deps: ValidatorDependencies) -> Self {
        Self { config, deps }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Validate one transaction against the ledger of `net_id`.
    pub fn validate_transaction(
        &self,
        tx: &Transaction,
        net_id: &str,
    ) -> Result<(), TransactionRejected> {
        self.validate_against(tx, net_id, &Commitments::new())
    }

    /// Validate `tx` as if every transaction recorded in `committed` had
    /// already been applied.
    pub fn validate_against(
        &self,
        tx: &Transaction,
        net_id: &str,
        committed: &Commitments,
    ) -> Result<(), TransactionRejected> {
        self.check(tx, net_id, committed).map_err(|reason| {
            debug!(hash = tx.hash(), %reason, "Transaction rejected");
            TransactionRejected::new(tx, reason)
        })
    }

    fn check(&self, tx: &Transaction, net_id: &str, committed: &Commitments) -> Check {
        let state = tx
            .as_state()
            .ok_or(TransactionRejection::NotStateTransaction)?;

        let expected = self.config.network.transaction_version;
        if state.base.version != expected {
            return Err(TransactionRejection::UnsupportedVersion {
                expected,
                actual: state.base.version,
            });
        }

        if !tx.is_finalized() {
            return Err(TransactionRejection::NotFinalized);
        }
        let recomputed = codec::transaction_hash(tx);
        if tx.hash() != recomputed {
            return Err(TransactionRejection::HashMismatch {
                expected: recomputed,
                actual: tx.hash().to_string(),
            });
        }

        if committed.contains(tx.hash()) {
            return Err(TransactionRejection::Duplicate);
        }
        // Coinbase claims carry no sender and repeat byte for byte.
        if !tx.is_coinbase() {
            self.check_not_on_chain(tx, net_id, committed)?;
        }

        self.check_action(state, net_id, committed)?;
        self.check_signature(tx, state)
    }

    fn check_not_on_chain(&self, tx: &Transaction, net_id: &str, committed: &Commitments) -> Check {
        match self
            .deps
            .repository
            .get_block_by_transaction_hash(net_id, tx.hash())
        {
            Ok(block) if committed.is_sibling(&block) => Ok(()),
            Ok(block) => Err(TransactionRejection::AlreadyOnChain {
                block_hash: block.hash().to_string(),
            }),
            Err(RepositoryError::NotFound(_)) => Ok(()),
            Err(RepositoryError::Unavailable(msg)) => Err(TransactionRejection::LedgerUnavailable(msg)),
        }
    }

    fn check_action(&self, tx: &StateTransaction, net_id: &str, committed: &Commitments) -> Check {
        let action = tx.base.action;
        let minimum_fee = self.config.fees.minimum_for(action);

        match action {
            TransactionAction::ClaimCoinbase => {
                forbid(&tx.from_pub_key, "from_pub_key")?;
                require(&tx.to_pub_key, "to_pub_key")?;
                forbid(&tx.sku_block_hash, "sku_block_hash")?;
                check_fee(tx, minimum_fee)?;
                check_amount(tx)?;
                let reward = self.config.coinbase_reward;
                if tx.amount > reward {
                    return Err(TransactionRejection::RewardTooHigh {
                        reward,
                        actual: tx.amount,
                    });
                }
                Ok(())
            }
            TransactionAction::TransferToken => {
                let from = require(&tx.from_pub_key, "from_pub_key")?;
                require(&tx.to_pub_key, "to_pub_key")?;
                forbid(&tx.sku_block_hash, "sku_block_hash")?;
                check_fee(tx, minimum_fee)?;
                check_amount(tx)?;
                let required = tx.amount.saturating_add(tx.base.fee);
                self.require_tokens(from, required, net_id, committed)
            }
            TransactionAction::CreateSku => {
                let from = require(&tx.from_pub_key, "from_pub_key")?;
                forbid(&tx.to_pub_key, "to_pub_key")?;
                forbid(&tx.sku_block_hash, "sku_block_hash")?;
                check_fee(tx, minimum_fee)?;
                let data = require(&tx.base.data, "data")?;
                SkuData::from_json(data)
                    .map_err(|e| TransactionRejection::InvalidSkuData(e.to_string()))?;
                self.require_tokens(from, tx.base.fee, net_id, committed)
            }
            TransactionAction::ChangeSku => Err(TransactionRejection::ActionNotImplemented(action)),
            TransactionAction::CreateSupply => {
                let from = require(&tx.from_pub_key, "from_pub_key")?;
                forbid(&tx.to_pub_key, "to_pub_key")?;
                let creation = self.resolve_sku(tx, net_id)?;
                if creation.from_pub_key.as_deref() != Some(from) {
                    return Err(TransactionRejection::NotSkuOwner);
                }
                check_fee(tx, minimum_fee)?;
                check_amount(tx)?;
                self.require_tokens(from, tx.base.fee, net_id, committed)
            }
            TransactionAction::TransferSupply => {
                let from = require(&tx.from_pub_key, "from_pub_key")?;
                require(&tx.to_pub_key, "to_pub_key")?;
                self.resolve_sku(tx, net_id)?;
                check_fee(tx, minimum_fee)?;
                check_amount(tx)?;
                self.require_supply(from, tx, net_id, committed)?;
                self.require_tokens(from, tx.base.fee, net_id, committed)
            }
            TransactionAction::DestroySupply => {
                let from = require(&tx.from_pub_key, "from_pub_key")?;
                forbid(&tx.to_pub_key, "to_pub_key")?;
                self.resolve_sku(tx, net_id)?;
                check_fee(tx, minimum_fee)?;
                check_amount(tx)?;
                self.require_supply(from, tx, net_id, committed)?;
                self.require_tokens(from, tx.base.fee, net_id, committed)
            }
            TransactionAction::Unknown => Err(TransactionRejection::UnknownAction),
        }
    }

    fn check_signature(&self, tx: &Transaction, state: &StateTransaction) -> Check {
        let key = if tx.is_coinbase() {
            &state.to_pub_key
        } else {
            &state.from_pub_key
        };
        let key = key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(TransactionRejection::EmptySigningKey)?;

        if !self
            .deps
            .signer
            .signature_is_valid(tx.signature(), tx.hash(), key)
        {
            return Err(TransactionRejection::InvalidSignature);
        }
        Ok(())
    }

    /// The `CreateSku` transaction this one points at.
    fn resolve_sku(&self, tx: &StateTransaction, net_id: &str) -> Check<StateTransaction> {
        let block_hash = require(&tx.sku_block_hash, "sku_block_hash")?;
        let not_found = || TransactionRejection::SkuNotFound {
            block_hash: block_hash.to_string(),
            tx_index: tx.sku_tx_index,
        };

        let block = self
            .deps
            .repository
            .get_block_by_hash(net_id, block_hash)
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => not_found(),
                RepositoryError::Unavailable(msg) => TransactionRejection::LedgerUnavailable(msg),
            })?;
        let referenced = block
            .transactions
            .get(tx.sku_tx_index as usize)
            .ok_or_else(not_found)?;

        match referenced.as_state() {
            Some(creation) if creation.base.action == TransactionAction::CreateSku => {
                Ok(creation.clone())
            }
            _ => Err(TransactionRejection::NotASkuCreation {
                block_hash: block_hash.to_string(),
                tx_index: tx.sku_tx_index,
            }),
        }
    }

    fn require_tokens(
        &self,
        key: &str,
        required: u64,
        net_id: &str,
        committed: &Commitments,
    ) -> Check {
        let available = ledger_value(self.deps.tokens.get_token_balance_for_pub_key(key, net_id))?
            .saturating_sub(committed.tokens(key));
        if available < required {
            return Err(TransactionRejection::InsufficientTokenBalance {
                required,
                available,
            });
        }
        Ok(())
    }

    fn require_supply(
        &self,
        key: &str,
        tx: &StateTransaction,
        net_id: &str,
        committed: &Commitments,
    ) -> Check {
        let block_hash = require(&tx.sku_block_hash, "sku_block_hash")?;
        let available = ledger_value(self.deps.skus.get_supply_balance_for_pub_key(
            key,
            block_hash,
            tx.sku_tx_index,
            net_id,
        ))?
        .saturating_sub(committed.supply(key, block_hash, tx.sku_tx_index));
        if available < tx.amount {
            return Err(TransactionRejection::InsufficientSupply {
                required: tx.amount,
                available,
            });
        }
        Ok(())
    }
}

/// An unknown network or key holds nothing.
fn ledger_value(result: Result<u64, RepositoryError>) -> Check<u64> {
    match result {
        Ok(value) => Ok(value),
        Err(RepositoryError::NotFound(_)) => Ok(0),
        Err(RepositoryError::Unavailable(msg)) => Err(TransactionRejection::LedgerUnavailable(msg)),
    }
}

fn require<'a>(field: &'a Option<String>, name: &'static str) -> Check<&'a str> {
    field
        .as_deref()
        .ok_or(TransactionRejection::MissingField(name))
}

fn forbid(field: &Option<String>, name: &'static str) -> Check {
    match field {
        Some(_) => Err(TransactionRejection::UnexpectedField(name)),
        None => Ok(()),
    }
}

fn check_fee(tx: &StateTransaction, minimum: u64) -> Check {
    if tx.base.fee < minimum {
        return Err(TransactionRejection::FeeTooLow {
            minimum,
            actual: tx.base.fee,
        });
    }
    Ok(())
}

fn check_amount(tx: &StateTransaction) -> Check {
    if tx.amount < 1 {
        return Err(TransactionRejection::AmountTooLow {
            minimum: 1,
            actual: tx.amount,
        });
    }
    Ok(())
}
