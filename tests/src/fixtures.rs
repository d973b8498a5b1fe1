//! Test nodes and helpers shared by the integration flows and benches.

use lc_block_production::{MinerConfig, MiningDependencies, MiningService};
use lc_consensus::adapters::{
    in_memory_dependencies, FixedTimestamper, InMemoryChainRepository, PlaceholderSigner,
};
use lc_consensus::{
    codec, merkle_root, ConsensusConfig, KeyPair, Signer, Timestamper, TransactionCreator,
};
use primitive_types::U256;
use shared_types::{Block, BlockHeader, Chain, SharedChain, SkuData, Transaction};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const NET_ID: &str = "testnet";
pub const GENESIS_TIME: i64 = 1_700_000_000;

/// Install a test-friendly subscriber once. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A leading `0` hex digit is enough to meet this target.
pub fn easy_target() -> U256 {
    U256::MAX >> 4
}

/// Defaults with the easy target.
pub fn easy_consensus() -> ConsensusConfig {
    ConsensusConfig {
        maximum_target: easy_target(),
        ..ConsensusConfig::for_network(NET_ID)
    }
}

/// Placeholder key pairs use one string for both halves.
pub fn keys(name: &str) -> KeyPair {
    KeyPair::new(name, name)
}

pub fn pallet_sku() -> SkuData {
    SkuData {
        sku_id: "PAL-0042".into(),
        ean_code: "4006381333931".into(),
        description: "Euro pallet, hardwood".into(),
    }
}

/// One node: its own chain, repository, clock and mining service.
pub struct TestNode {
    pub chain: SharedChain,
    pub repository: Arc<InMemoryChainRepository>,
    pub clock: Arc<FixedTimestamper>,
    pub consensus: Arc<ConsensusConfig>,
    pub service: Arc<MiningService>,
    pub wallet: TransactionCreator,
}

impl TestNode {
    pub fn new(miner: &str) -> Self {
        Self::with_config(easy_consensus(), MinerConfig::new(miner, miner))
    }

    pub fn with_config(consensus: ConsensusConfig, miner: MinerConfig) -> Self {
        Self::with_signer(consensus, miner, Arc::new(PlaceholderSigner))
    }

    pub fn with_signer(
        consensus: ConsensusConfig,
        miner: MinerConfig,
        signer: Arc<dyn Signer>,
    ) -> Self {
        let chain = Chain::new(consensus.network.magic_number.clone()).into_shared();
        let repository = Arc::new(InMemoryChainRepository::with_chain(chain.clone()));
        let mut validation = in_memory_dependencies(repository.clone());
        validation.signer = signer;
        let clock = Arc::new(FixedTimestamper::new(GENESIS_TIME));
        let consensus = Arc::new(consensus);

        let service = MiningService::new(
            MiningDependencies {
                consensus: consensus.clone(),
                validation: validation.clone(),
                clock: clock.clone(),
                chain: chain.clone(),
            },
            miner,
        )
        .expect("valid test configuration");

        Self {
            wallet: TransactionCreator::new(validation.signer, consensus.network.transaction_version),
            chain,
            repository,
            clock,
            consensus,
            service: Arc::new(service),
        }
    }

    pub fn height(&self) -> i64 {
        self.chain.read().current_height()
    }

    pub fn tip(&self) -> Option<Block> {
        self.chain.read().tip().cloned()
    }

    pub fn coinbase(&self, to: &str) -> Transaction {
        self.wallet
            .claim_coinbase(&keys(to), self.consensus.coinbase_reward, 0)
            .expect("fresh transaction")
    }

    /// Seal a block by hand the way a remote miner would, at the node's
    /// current time.
    pub fn seal_block(
        &self,
        transactions: Vec<Transaction>,
        previous: Option<&str>,
        signer: &str,
    ) -> Block {
        seal_block(
            NET_ID,
            transactions,
            previous,
            signer,
            self.clock.current_utc_timestamp(),
            self.consensus.maximum_target,
        )
    }
}

/// Nonce search outside any validator. The result meets `target` and
/// starts with a `0` hex digit.
pub fn seal_block(
    net_id: &str,
    transactions: Vec<Transaction>,
    previous: Option<&str>,
    signer: &str,
    timestamp: i64,
    target: U256,
) -> Block {
    let root = merkle_root(&transactions).expect("non-empty transaction set");
    let mut header = BlockHeader::new(net_id, 1, root, timestamp, previous.map(String::from));
    loop {
        let hash = codec::header_hash(&header, transactions.len());
        let meets = codec::hash_to_u256(&hash).is_some_and(|value| value < target);
        if hash.starts_with('0') && meets {
            let signature = PlaceholderSigner.create_signature(&hash, signer);
            header.finalize(hash, signature).expect("open header");
            return Block::new(header, transactions);
        }
        header.increment_nonce().expect("nonce space");
    }
}

/// Poll `done` until it holds or ten seconds pass.
pub fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}
