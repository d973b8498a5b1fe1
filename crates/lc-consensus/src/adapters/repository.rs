//! In-memory chain repository
//!
//! Lookups are served from live [`SharedChain`] handles. `update` stores a
//! snapshot; a network known only by its snapshot is restored into a live
//! handle on first access.

use crate::ports::ChainRepository;
use parking_lot::RwLock;
use shared_types::{Block, Chain, RepositoryError, SharedChain};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryChainRepository {
    live: RwLock<HashMap<String, SharedChain>>,
    persisted: RwLock<HashMap<String, Chain>>,
}

impl InMemoryChainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository serving one live chain.
    pub fn with_chain(chain: SharedChain) -> Self {
        let repository = Self::new();
        repository.attach(chain);
        repository
    }

    /// Serve lookups for this chain's network from the live handle.
    pub fn attach(&self, chain: SharedChain) {
        let net_id = chain.read().magic_number().to_string();
        self.live.write().insert(net_id, chain);
    }

    /// Last snapshot stored by `update`.
    pub fn persisted(&self, net_id: &str) -> Option<Chain> {
        self.persisted.read().get(net_id).cloned()
    }

    fn not_found(what: &str, key: &str) -> RepositoryError {
        RepositoryError::NotFound(format!("{what} {key}"))
    }
}

impl ChainRepository for InMemoryChainRepository {
    fn get_chain_by_net_id(&self, net_id: &str) -> Result<SharedChain, RepositoryError> {
        if let Some(chain) = self.live.read().get(net_id) {
            return Ok(chain.clone());
        }

        let snapshot = self
            .persisted
            .read()
            .get(net_id)
            .cloned()
            .ok_or_else(|| Self::not_found("chain", net_id))?;
        let mut live = self.live.write();
        // Another reader may have restored it meanwhile.
        let chain = live
            .entry(net_id.to_string())
            .or_insert_with(|| snapshot.into_shared())
            .clone();
        debug!(net_id, "Restored chain from snapshot");
        Ok(chain)
    }

    fn get_block_by_hash(&self, net_id: &str, block_hash: &str) -> Result<Block, RepositoryError> {
        let chain = self.get_chain_by_net_id(net_id)?;
        let chain = chain.read();
        chain
            .block_by_hash(block_hash)
            .cloned()
            .ok_or_else(|| Self::not_found("block", block_hash))
    }

    fn get_block_by_transaction_hash(
        &self,
        net_id: &str,
        tx_hash: &str,
    ) -> Result<Block, RepositoryError> {
        let chain = self.get_chain_by_net_id(net_id)?;
        let chain = chain.read();
        chain
            .blocks()
            .iter()
            .find(|block| block.transactions.iter().any(|tx| tx.hash() == tx_hash))
            .cloned()
            .ok_or_else(|| Self::not_found("transaction", tx_hash))
    }

    fn get_height_for_block(&self, net_id: &str, block_hash: &str) -> Result<u64, RepositoryError> {
        let chain = self.get_chain_by_net_id(net_id)?;
        let height = chain.read().height_of(block_hash);
        height.ok_or_else(|| Self::not_found("block", block_hash))
    }

    fn update(&self, chain: &Chain) -> Result<(), RepositoryError> {
        debug!(
            net_id = chain.magic_number(),
            height = chain.current_height(),
            "Persisting chain snapshot"
        );
        self.persisted
            .write()
            .insert(chain.magic_number().to_string(), chain.clone());
        Ok(())
    }

    fn delete(&self, net_id: &str) -> Result<(), RepositoryError> {
        let live = self.live.write().remove(net_id);
        let persisted = self.persisted.write().remove(net_id);
        if live.is_none() && persisted.is_none() {
            return Err(Self::not_found("chain", net_id));
        }
        Ok(())
    }
}
