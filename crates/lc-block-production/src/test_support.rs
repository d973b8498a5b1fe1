//! Shared fixtures for unit tests.

use crate::config::MinerConfig;
use crate::service::{MiningDependencies, MiningService};
use lc_consensus::adapters::{in_memory_dependencies, FixedTimestamper, InMemoryChainRepository};
use lc_consensus::{BlockValidator, ConsensusConfig, KeyPair, TransactionCreator, ValidatorDependencies};
use primitive_types::U256;
use shared_types::{Block, BlockHeader, Chain, SharedChain, Transaction};
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000;

/// A leading `0` hex digit is enough to meet this target.
pub fn easy_target() -> U256 {
    U256::MAX >> 4
}

pub fn keys(name: &str) -> KeyPair {
    KeyPair::new(name, name)
}

pub struct Node {
    pub chain: SharedChain,
    pub repository: Arc<InMemoryChainRepository>,
    pub clock: Arc<FixedTimestamper>,
    pub consensus: Arc<ConsensusConfig>,
    pub deps: ValidatorDependencies,
    pub creator: TransactionCreator,
}

impl Node {
    pub fn new() -> Self {
        let chain = Chain::new("testnet").into_shared();
        let repository = Arc::new(InMemoryChainRepository::with_chain(chain.clone()));
        let deps = in_memory_dependencies(repository.clone());
        let consensus = ConsensusConfig {
            maximum_target: easy_target(),
            ..ConsensusConfig::default()
        };
        Self {
            creator: TransactionCreator::new(deps.signer.clone(), 1),
            chain,
            repository,
            clock: Arc::new(FixedTimestamper::new(NOW)),
            consensus: Arc::new(consensus),
            deps,
        }
    }

    pub fn validator(&self) -> Arc<BlockValidator> {
        Arc::new(BlockValidator::new(
            self.consensus.clone(),
            self.deps.clone(),
            self.clock.clone(),
        ))
    }

    pub fn dependencies(&self) -> MiningDependencies {
        MiningDependencies {
            consensus: self.consensus.clone(),
            validation: self.deps.clone(),
            clock: self.clock.clone(),
            chain: self.chain.clone(),
        }
    }

    pub fn service(&self, miner: &str) -> Arc<MiningService> {
        self.service_with(MinerConfig::new(miner, miner))
    }

    pub fn service_with(&self, config: MinerConfig) -> Arc<MiningService> {
        Arc::new(MiningService::new(self.dependencies(), config).unwrap())
    }

    pub fn coinbase(&self, to: &str) -> Transaction {
        self.creator.claim_coinbase(&keys(to), 50, 0).unwrap()
    }

    /// Push a sealed block without validation. Does not bump any tip watch.
    pub fn push_unchecked(&self, hash: &str, previous: Option<&str>, txs: Vec<Transaction>) {
        let mut header = BlockHeader::new("testnet", 1, "root", NOW, previous.map(String::from));
        header.finalize(hash.into(), "sig".into()).unwrap();
        self.chain.write().push_block(Block::new(header, txs));
    }
}
