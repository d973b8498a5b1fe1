//! # Block Creator
//!
//! Proof-of-work nonce search. Every attempt is sealed and handed to the
//! block validator with writing enabled, so a successful attempt is already
//! part of the chain when the search returns.
//!
//! **Hot restart:** the candidate records the `TipWatch` generation it was
//! built against. When the generation moves (a block arrived from
//! elsewhere), the candidate is rebuilt on the new tip before the next nonce.
//! With a retarget calculator the rebuilt candidate also takes the
//! difficulty of its new parent.

use crate::error::{MiningError, MiningResult};
use lc_consensus::{
    codec, merkle_root, BlockAcceptance, BlockValidator, Difficulty, DifficultyCalculator,
    DifficultyError, Signer,
};
use primitive_types::U256;
use shared_types::{Block, BlockHeader, SharedChain, Transaction};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything needed to mine one block.
#[derive(Debug, Clone)]
pub struct BlockRequest {
    pub signing_key: String,
    pub chain: SharedChain,
    pub version: u32,
    /// Coinbase first, then pool entries.
    pub transactions: Vec<Transaction>,
    pub difficulty: Difficulty,
    pub maximum_target: U256,
    pub starting_nonce: u64,
}

impl BlockRequest {
    pub fn new(
        signing_key: impl Into<String>,
        chain: SharedChain,
        transactions: Vec<Transaction>,
        difficulty: Difficulty,
        maximum_target: U256,
    ) -> Self {
        Self {
            signing_key: signing_key.into(),
            chain,
            version: 1,
            transactions,
            difficulty,
            maximum_target,
            starting_nonce: 0,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_starting_nonce(mut self, nonce: u64) -> Self {
        self.starting_nonce = nonce;
        self
    }
}

/// A block that won its nonce search, and how the chain took it.
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    pub acceptance: BlockAcceptance,
    /// Nonces tried, across restarts.
    pub attempts: u64,
    pub restarts: u32,
}

struct Candidate {
    header: BlockHeader,
    target: U256,
    generation: u64,
}

/// Nonce search driver.
pub struct BlockCreator {
    validator: Arc<BlockValidator>,
    signer: Arc<dyn Signer>,
    retarget: Option<Arc<DifficultyCalculator>>,
}

impl BlockCreator {
    pub fn new(validator: Arc<BlockValidator>, signer: Arc<dyn Signer>) -> Self {
        Self {
            validator,
            signer,
            retarget: None,
        }
    }

    /// Derive each candidate's difficulty from its parent instead of
    /// using the request's value for the whole search.
    pub fn with_retarget(mut self, calculator: Arc<DifficultyCalculator>) -> Self {
        self.retarget = Some(calculator);
        self
    }

    pub fn validator(&self) -> &Arc<BlockValidator> {
        &self.validator
    }

    /// Mine a block and return it once the chain has accepted it.
    pub fn create_block(&self, request: BlockRequest, cancel: &AtomicBool) -> MiningResult<Block> {
        self.mine(request, cancel).map(|mined| mined.block)
    }

    /// Like [`create_block`](Self::create_block), keeping the acceptance
    /// so callers can react to a displaced tip.
    ///
    /// # Errors
    /// - `Difficulty` if the difficulty is below 1
    /// - `Cancelled` once `cancel` is raised
    /// - `NonceLimitReached` when the nonce would pass `u64::MAX`
    /// - `Consensus` for a rejection no other nonce can fix
    #[tracing::instrument(
        skip_all,
        fields(difficulty = %request.difficulty, transactions = request.transactions.len())
    )]
    pub fn mine(&self, request: BlockRequest, cancel: &AtomicBool) -> MiningResult<MinedBlock> {
        if !request.difficulty.is_at_least_one() {
            return Err(DifficultyError::InvalidDifficulty(format!(
                "difficulty {} is below 1",
                request.difficulty
            ))
            .into());
        }

        let mut transactions = request.transactions.clone();
        let mut candidate = self.candidate(&request, &transactions)?;
        let mut attempts = 0u64;
        let mut restarts = 0u32;

        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!(attempts, "Mining cancelled");
                return Err(MiningError::Cancelled);
            }

            if self.validator.tip_watch().has_moved_since(candidate.generation) {
                transactions = unconfirmed(&request.chain, transactions);
                candidate = self.candidate(&request, &transactions)?;
                restarts += 1;
                info!(
                    previous = candidate.header.previous_hash.as_deref().unwrap_or("none"),
                    target = %candidate.target,
                    remaining = transactions.len(),
                    "Tip moved, restarting candidate"
                );
                continue;
            }

            candidate.header.increment_nonce()?;
            attempts += 1;

            let hash = codec::header_hash(&candidate.header, transactions.len());
            let signature = self.signer.create_signature(&hash, &request.signing_key);
            let mut header = candidate.header.clone();
            header.finalize(hash, signature)?;
            let block = Block::new(header, transactions.clone());

            match self
                .validator
                .validate_block(&block, candidate.target, &request.chain, true, true)
            {
                Ok(acceptance) => {
                    info!(
                        hash = block.hash(),
                        height = acceptance.height(),
                        nonce = block.header.nonce(),
                        attempts,
                        "Block mined"
                    );
                    return Ok(MinedBlock {
                        block,
                        acceptance,
                        attempts,
                        restarts,
                    });
                }
                Err(e) if e.is_retryable() => continue,
                // The attempt raced a tip change; the next iteration rebuilds.
                Err(e) if self.validator.tip_watch().has_moved_since(candidate.generation) => {
                    debug!(error = %e, "Attempt overtaken by a new tip");
                }
                Err(e) => return Err(MiningError::Consensus(e)),
            }
        }
    }

    fn candidate(
        &self,
        request: &BlockRequest,
        transactions: &[Transaction],
    ) -> MiningResult<Candidate> {
        // Read the generation first: a write in between only causes an
        // extra restart.
        let generation = self.validator.tip_watch().generation();
        let (magic_number, previous_hash, difficulty) = {
            let chain = request.chain.read();
            let previous_hash = chain.tip().map(|tip| tip.hash().to_string());
            let difficulty = match &self.retarget {
                Some(calculator) => calculator.block_difficulty(&chain, previous_hash.as_deref())?,
                None => request.difficulty,
            };
            (chain.magic_number().to_string(), previous_hash, difficulty)
        };
        let target = difficulty.target(request.maximum_target)?;
        let root = merkle_root(transactions)?;
        let timestamp = self.validator.clock().current_utc_timestamp();

        debug!(generation, previous = ?previous_hash, %difficulty, timestamp, "Candidate built");
        let header = BlockHeader::new(magic_number, request.version, root, timestamp, previous_hash)
            .with_nonce(request.starting_nonce);
        Ok(Candidate {
            header,
            target,
            generation,
        })
    }
}

impl std::fmt::Debug for BlockCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCreator")
            .field("generation", &self.validator.tip_watch().generation())
            .finish()
    }
}

/// Drop transactions the chain already carries. Coinbase claims stay.
fn unconfirmed(chain: &SharedChain, transactions: Vec<Transaction>) -> Vec<Transaction> {
    let chain = chain.read();
    let confirmed: HashSet<&str> = chain
        .blocks()
        .iter()
        .flat_map(|block| block.transactions.iter())
        .filter(|tx| !tx.is_coinbase())
        .map(|tx| tx.hash())
        .collect();
    transactions
        .into_iter()
        .filter(|tx| tx.is_coinbase() || !confirmed.contains(tx.hash()))
        .collect()
}
