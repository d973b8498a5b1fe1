//! Fixtures shared by the unit tests.

use crate::adapters::{ChainLedger, FixedTimestamper, InMemoryChainRepository, PlaceholderSigner};
use crate::config::ConsensusConfig;
use crate::domain::{
    codec, merkle_root, BlockValidator, KeyPair, TransactionCreator, TransactionValidator,
    ValidatorDependencies,
};
use crate::ports::Signer;
use shared_types::{Block, BlockHeader, Chain, SharedChain, SkuData, Transaction, U256};
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000;

/// Any hash with a leading zero nibble meets it.
pub fn easy_target() -> U256 {
    U256::MAX >> 4
}

/// Placeholder key pair: both halves are the name.
pub fn keys(name: &str) -> KeyPair {
    KeyPair::new(name, name)
}

pub fn sku_data() -> SkuData {
    SkuData {
        sku_id: "SKU-1".into(),
        ean_code: "4006381333931".into(),
        description: "Pallet of bolts".into(),
    }
}

pub struct Fixture {
    pub chain: SharedChain,
    pub repository: Arc<InMemoryChainRepository>,
    pub deps: ValidatorDependencies,
    pub config: Arc<ConsensusConfig>,
    pub creator: TransactionCreator,
    pub clock: Arc<FixedTimestamper>,
}

impl Fixture {
    /// Empty "testnet" chain.
    pub fn new() -> Self {
        Self::with_blocks(vec![])
    }

    /// Block `0A` pays 50 tokens to alice.
    pub fn funded() -> Self {
        let fixture = Self::new();
        let coinbase = fixture.coinbase("alice", 50);
        fixture.push_unchecked("0A", None, vec![coinbase]);
        fixture
    }

    /// On top of `funded`: block `0B` holds alice's SKU at index 1, block
    /// `0C` gives her 100 units of it.
    pub fn with_sku() -> Self {
        let fixture = Self::funded();
        let alice = keys("alice");
        let sku = fixture.creator.create_sku(&alice, &sku_data(), 1).unwrap();
        fixture.push_unchecked("0B", Some("0A"), vec![fixture.coinbase("miner", 50), sku]);

        let supply = fixture
            .creator
            .create_supply(
                &alice,
                crate::domain::SkuRef {
                    block_hash: "0B",
                    tx_index: 1,
                },
                100,
                1,
            )
            .unwrap();
        fixture.push_unchecked("0C", Some("0B"), vec![fixture.coinbase("miner", 50), supply]);
        fixture
    }

    fn with_blocks(blocks: Vec<Block>) -> Self {
        let chain = Chain::from_blocks("testnet", blocks).into_shared();
        let repository = Arc::new(InMemoryChainRepository::with_chain(chain.clone()));
        let ledger = Arc::new(ChainLedger::new(repository.clone()));
        let signer: Arc<dyn Signer> = Arc::new(PlaceholderSigner);
        let deps = ValidatorDependencies {
            signer: signer.clone(),
            repository: repository.clone(),
            tokens: ledger.clone(),
            skus: ledger,
        };
        let config = ConsensusConfig {
            maximum_target: easy_target(),
            ..ConsensusConfig::default()
        };

        Self {
            chain,
            repository,
            deps,
            config: Arc::new(config),
            creator: TransactionCreator::new(signer, 1),
            clock: Arc::new(FixedTimestamper::new(NOW)),
        }
    }

    pub fn coinbase(&self, to: &str, amount: u64) -> Transaction {
        self.creator.claim_coinbase(&keys(to), amount, 0).unwrap()
    }

    pub fn transaction_validator(&self) -> TransactionValidator {
        TransactionValidator::new(self.config.clone(), self.deps.clone())
    }

    pub fn block_validator(&self) -> BlockValidator {
        BlockValidator::new(self.config.clone(), self.deps.clone(), self.clock.clone())
    }

    /// Append a block with an arbitrary hash, skipping validation.
    pub fn push_unchecked(&self, hash: &str, previous: Option<&str>, transactions: Vec<Transaction>) {
        let mut header = BlockHeader::new("testnet", 1, "root", NOW, previous.map(String::from));
        header.finalize(hash.into(), "sig".into()).unwrap();
        self.chain.write().push_block(Block::new(header, transactions));
    }

    pub fn mine(&self, transactions: Vec<Transaction>, previous: Option<String>, signer: &str) -> Block {
        self.mine_at(transactions, previous, signer, NOW)
    }

    /// Search nonces until the hash meets [`easy_target`], then sign with
    /// `signer`'s key.
    pub fn mine_at(
        &self,
        transactions: Vec<Transaction>,
        previous: Option<String>,
        signer: &str,
        timestamp: i64,
    ) -> Block {
        let root = merkle_root(&transactions).unwrap();
        let mut header = BlockHeader::new("testnet", 1, root, timestamp, previous);
        loop {
            let hash = codec::header_hash(&header, transactions.len());
            let value = codec::hash_to_u256(&hash).unwrap();
            if hash.starts_with('0') && value < easy_target() {
                let signature = PlaceholderSigner.create_signature(&hash, signer);
                header.finalize(hash, signature).unwrap();
                return Block::new(header, transactions);
            }
            header.increment_nonce().unwrap();
        }
    }
}
