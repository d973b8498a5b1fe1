//! Ledger readers folded from the chain
//!
//! Balances are recomputed from genesis on every query:
//!
//! - a coinbase claim credits `amount` to its recipient
//! - a token transfer moves `amount` from sender to recipient
//! - every fee is debited from the sender and credited to the recipient of
//!   the block's coinbase
//! - supply is created, moved and destroyed per referenced SKU

use crate::ports::{ChainRepository, SkuLedgerReader, TokenLedgerReader};
use shared_types::{
    Block, Chain, RepositoryError, Sku, SkuData, StateTransaction, TransactionAction,
};
use std::sync::Arc;

pub struct ChainLedger {
    repository: Arc<dyn ChainRepository>,
}

impl ChainLedger {
    pub fn new(repository: Arc<dyn ChainRepository>) -> Self {
        Self { repository }
    }

    fn with_chain<T>(&self, net_id: &str, f: impl FnOnce(&Chain) -> T) -> Result<T, RepositoryError> {
        let chain = self.repository.get_chain_by_net_id(net_id)?;
        let chain = chain.read();
        Ok(f(&chain))
    }
}

fn state_transactions(block: &Block) -> impl Iterator<Item = &StateTransaction> {
    block.transactions.iter().filter_map(|tx| tx.as_state())
}

fn coinbase_recipient(block: &Block) -> Option<&str> {
    block
        .transactions
        .first()
        .filter(|tx| tx.is_coinbase())
        .and_then(|tx| tx.as_state())
        .and_then(|tx| tx.to_pub_key.as_deref())
}

fn is_key(field: &Option<String>, key: &str) -> bool {
    field.as_deref() == Some(key)
}

/// Token balance of `key` across the whole chain.
pub fn token_balance(chain: &Chain, key: &str) -> u64 {
    let mut credit: u128 = 0;
    let mut debit: u128 = 0;

    for block in chain.blocks() {
        let miner = coinbase_recipient(block);
        for tx in state_transactions(block) {
            match tx.base.action {
                TransactionAction::ClaimCoinbase if is_key(&tx.to_pub_key, key) => {
                    credit += tx.amount as u128;
                }
                TransactionAction::TransferToken => {
                    if is_key(&tx.from_pub_key, key) {
                        debit += tx.amount as u128;
                    }
                    if is_key(&tx.to_pub_key, key) {
                        credit += tx.amount as u128;
                    }
                }
                _ => {}
            }

            if tx.from_pub_key.is_some() {
                if is_key(&tx.from_pub_key, key) {
                    debit += tx.base.fee as u128;
                }
                if miner == Some(key) {
                    credit += tx.base.fee as u128;
                }
            }
        }
    }

    u64::try_from(credit.saturating_sub(debit)).unwrap_or(u64::MAX)
}

/// Units of one SKU held by `key`.
pub fn supply_balance(chain: &Chain, key: &str, sku_block_hash: &str, sku_tx_index: u32) -> u64 {
    let mut credit: u128 = 0;
    let mut debit: u128 = 0;

    let referencing = chain.blocks().iter().flat_map(state_transactions).filter(|tx| {
        tx.sku_block_hash.as_deref() == Some(sku_block_hash) && tx.sku_tx_index == sku_tx_index
    });
    for tx in referencing {
        match tx.base.action {
            TransactionAction::CreateSupply if is_key(&tx.from_pub_key, key) => {
                credit += tx.amount as u128;
            }
            TransactionAction::TransferSupply => {
                if is_key(&tx.from_pub_key, key) {
                    debit += tx.amount as u128;
                }
                if is_key(&tx.to_pub_key, key) {
                    credit += tx.amount as u128;
                }
            }
            TransactionAction::DestroySupply if is_key(&tx.from_pub_key, key) => {
                debit += tx.amount as u128;
            }
            _ => {}
        }
    }

    u64::try_from(credit.saturating_sub(debit)).unwrap_or(u64::MAX)
}

/// The SKU created by `sku_block_hash#sku_tx_index`, with its changes.
pub fn find_sku(chain: &Chain, sku_block_hash: &str, sku_tx_index: u32) -> Option<Sku> {
    let block = chain.block_by_hash(sku_block_hash)?;
    let creation = block
        .transactions
        .get(sku_tx_index as usize)
        .and_then(|tx| tx.as_state())
        .filter(|tx| tx.base.action == TransactionAction::CreateSku)?;
    let creator = creation.from_pub_key.clone()?;
    let data = SkuData::from_json(creation.base.data.as_deref()?).ok()?;

    let changes = chain
        .blocks()
        .iter()
        .flat_map(state_transactions)
        .filter(|tx| {
            tx.base.action == TransactionAction::ChangeSku
                && tx.sku_block_hash.as_deref() == Some(sku_block_hash)
                && tx.sku_tx_index == sku_tx_index
        })
        .filter_map(|tx| tx.base.data.as_deref())
        .filter_map(|data| SkuData::from_json(data).ok())
        .collect();

    Some(Sku {
        block_hash: sku_block_hash.to_string(),
        tx_index: sku_tx_index,
        creator,
        data,
        changes,
    })
}

impl TokenLedgerReader for ChainLedger {
    fn get_token_balance_for_pub_key(
        &self,
        pub_key: &str,
        net_id: &str,
    ) -> Result<u64, RepositoryError> {
        self.with_chain(net_id, |chain| token_balance(chain, pub_key))
    }
}

impl SkuLedgerReader for ChainLedger {
    fn get_supply_balance_for_pub_key(
        &self,
        pub_key: &str,
        sku_block_hash: &str,
        sku_tx_index: u32,
        net_id: &str,
    ) -> Result<u64, RepositoryError> {
        self.with_chain(net_id, |chain| {
            supply_balance(chain, pub_key, sku_block_hash, sku_tx_index)
        })
    }

    fn get_sku(
        &self,
        sku_block_hash: &str,
        sku_tx_index: u32,
        net_id: &str,
    ) -> Result<Sku, RepositoryError> {
        self.with_chain(net_id, |chain| find_sku(chain, sku_block_hash, sku_tx_index))?
            .ok_or_else(|| RepositoryError::NotFound(format!("sku {sku_block_hash}#{sku_tx_index}")))
    }
}
