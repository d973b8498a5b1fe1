//! Block validation and tip selection
//!
//! Checks run in a fixed order and stop at the first failure. The expensive
//! per-transaction checks run without holding the chain lock; the final
//! tip decision re-reads the chain under the write lock so that two blocks
//! racing for the same parent are serialized.
//!
//! ## Tip selection
//!
//! - no block shares the parent: append
//! - exactly one does and it is the tip: the new block replaces it iff its
//!   hash is numerically lower
//! - anything else is a chain split, which is not supported

use super::codec;
use super::error::{BlockRejected, BlockRejection, ConsensusError, ConsensusResult};
use super::transaction_validation::{
    merkle_root, Commitments, TransactionValidator, ValidatorDependencies,
};
use crate::config::ConsensusConfig;
use crate::ports::{Signer, Timestamper};
use primitive_types::U256;
use shared_types::{Block, SharedChain};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Generation counter bumped on every chain write.
///
/// Miners record the generation when they build a candidate and rebuild
/// once it moves.
#[derive(Debug, Default)]
pub struct TipWatch {
    generation: AtomicU64,
}

impl TipWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn has_moved_since(&self, generation: u64) -> bool {
        self.generation() != generation
    }
}

/// How an accepted block entered the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAcceptance {
    Appended { height: u64 },
    /// The previous tip was displaced by a block with a lower hash.
    ReplacedTip { height: u64, displaced: Box<Block> },
}

impl BlockAcceptance {
    pub fn height(&self) -> u64 {
        match self {
            Self::Appended { height } | Self::ReplacedTip { height, .. } => *height,
        }
    }

    pub fn displaced(&self) -> Option<&Block> {
        match self {
            Self::ReplacedTip { displaced, .. } => Some(displaced),
            Self::Appended { .. } => None,
        }
    }
}

pub struct BlockValidator {
    config: Arc<ConsensusConfig>,
    transactions: TransactionValidator,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Timestamper>,
    tip_watch: Arc<TipWatch>,
}

impl BlockValidator {
    pub fn new(
        config: Arc<ConsensusConfig>,
        deps: ValidatorDependencies,
        clock: Arc<dyn Timestamper>,
    ) -> Self {
        Self {
            signer: deps.signer.clone(),
            transactions: TransactionValidator::new(config.clone(), deps),
            config,
            clock,
            tip_watch: Arc::new(TipWatch::new()),
        }
    }

    /// Share a generation counter with other writers of the same chain.
    pub fn with_tip_watch(mut self, tip_watch: Arc<TipWatch>) -> Self {
        self.tip_watch = tip_watch;
        self
    }

    pub fn tip_watch(&self) -> &Arc<TipWatch> {
        &self.tip_watch
    }

    pub fn transaction_validator(&self) -> &TransactionValidator {
        &self.transactions
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Timestamper> {
        &self.clock
    }

    /// Validate `block` against `chain` and, if `write` is set, apply it.
    ///
    /// Without `write` the returned acceptance describes what would happen.
    ///
    /// # Errors
    /// - `ConsensusError::Block` with the first failed check
    /// - `ConsensusError::Transaction` for the first invalid transaction
    #[tracing::instrument(skip_all, fields(hash = %block.hash(), write = write))]
    pub fn validate_block(
        &self,
        block: &Block,
        current_target: U256,
        chain: &SharedChain,
        check_timestamp: bool,
        write: bool,
    ) -> ConsensusResult<BlockAcceptance> {
        let reject = |reason: BlockRejection| -> ConsensusError {
            BlockRejected::new(block, reason).into()
        };
        let header = &block.header;

        let (net_id, chain_is_empty) = {
            let chain = chain.read();
            (chain.magic_number().to_string(), chain.is_empty())
        };
        if header.magic_number != net_id {
            return Err(reject(BlockRejection::NetworkMismatch {
                expected: net_id,
                actual: header.magic_number.clone(),
            }));
        }

        if !header.is_finalized() {
            return Err(reject(BlockRejection::NotFinalized));
        }
        let recomputed = codec::header_hash(header, block.transactions.len());
        if block.hash() != recomputed {
            return Err(reject(BlockRejection::HashMismatch {
                expected: recomputed,
                actual: block.hash().to_string(),
            }));
        }

        if !block.hash().starts_with('0') {
            return Err(reject(BlockRejection::NoLeadingZero));
        }
        let hash_value = codec::hash_to_u256(block.hash()).unwrap_or(U256::MAX);
        if hash_value >= current_target {
            return Err(reject(BlockRejection::TargetNotMet));
        }

        if check_timestamp {
            let now = self.clock.current_utc_timestamp();
            let max_offset = self.config.max_timestamp_offset_secs;
            if now.abs_diff(header.timestamp) > max_offset.unsigned_abs() {
                return Err(reject(BlockRejection::TimestampOutOfRange {
                    timestamp: header.timestamp,
                    now,
                    max_offset,
                }));
            }
        }

        if block.transactions.is_empty() {
            return Err(reject(BlockRejection::NoTransactions));
        }
        let root = merkle_root(&block.transactions)?;
        if root != header.merkle_root {
            return Err(reject(BlockRejection::MerkleRootMismatch {
                expected: root,
                actual: header.merkle_root.clone(),
            }));
        }

        if !block.transactions[0].is_coinbase() {
            return Err(reject(BlockRejection::FirstTransactionNotCoinbase));
        }
        if block.transactions.iter().filter(|tx| tx.is_coinbase()).count() > 1 {
            return Err(reject(BlockRejection::MultipleCoinbase));
        }

        let miner_key = block.transactions[0]
            .as_state()
            .and_then(|tx| tx.to_pub_key.as_deref())
            .unwrap_or_default();
        if !self
            .signer
            .signature_is_valid(header.signature(), block.hash(), miner_key)
        {
            return Err(reject(BlockRejection::InvalidSignature));
        }

        if !chain_is_empty {
            let chain = chain.read();
            check_parent(block, &chain).map_err(&reject)?;
        }

        // Each transaction sees the spending of the ones before it.
        let mut committed = Commitments::for_block(header.previous_hash.as_deref());
        for tx in &block.transactions {
            self.transactions.validate_against(tx, &net_id, &committed)?;
            committed.record(tx);
        }

        // Tip decision and write happen under one lock.
        let mut chain = chain.write();
        let acceptance = if chain.is_empty() {
            BlockAcceptance::Appended { height: 0 }
        } else {
            check_parent(block, &chain).map_err(&reject)?;
            let previous = header.previous_hash.as_deref().unwrap_or_default();
            let tip_height = chain.current_height();
            let siblings: Vec<(u64, &Block)> = chain.blocks_with_previous_hash(previous).collect();

            match siblings.as_slice() {
                [] => BlockAcceptance::Appended {
                    height: chain.len() as u64,
                },
                [(height, incumbent)] if *height as i64 == tip_height => {
                    let incumbent_value =
                        codec::hash_to_u256(incumbent.hash()).unwrap_or(U256::MAX);
                    if hash_value >= incumbent_value {
                        return Err(reject(BlockRejection::HigherDifficulty {
                            incumbent: incumbent.hash().to_string(),
                        }));
                    }
                    BlockAcceptance::ReplacedTip {
                        height: *height,
                        displaced: Box::new((*incumbent).clone()),
                    }
                }
                _ => return Err(reject(BlockRejection::ChainSplitNotSupported)),
            }
        };

        if !write {
            debug!(height = acceptance.height(), "Block valid (dry run)");
            return Ok(acceptance);
        }

        match &acceptance {
            BlockAcceptance::Appended { .. } => {
                chain.push_block(block.clone());
            }
            BlockAcceptance::ReplacedTip { displaced, .. } => {
                chain.replace_tip(block.clone());
                info!(displaced = displaced.hash(), "Tip replaced by lower hash");
            }
        }
        let generation = self.tip_watch.bump();
        drop(chain);

        info!(
            height = acceptance.height(),
            generation,
            transactions = block.transactions.len(),
            "Block accepted"
        );
        Ok(acceptance)
    }
}

fn check_parent(block: &Block, chain: &shared_types::Chain) -> Result<(), BlockRejection> {
    let previous = block
        .header
        .previous_hash
        .as_deref()
        .ok_or(BlockRejection::MissingPreviousHash)?;
    if !chain.contains(previous) {
        return Err(BlockRejection::UnknownPreviousBlock(previous.to_string()));
    }
    Ok(())
}
