//! Mining Service
//!
//! Ties the block creator, the transaction pool and block intake to one
//! shared chain. Locally mined and externally received blocks go through
//! the same validator, so the tip rule and the pool bookkeeping are applied
//! identically to both.

use crate::config::MinerConfig;
use crate::domain::{BlockCreator, BlockRequest};
use crate::error::{MiningError, MiningResult};
use lc_consensus::{
    BlockAcceptance, BlockValidator, ChainRepository, Commitments, ConfigError, ConsensusConfig,
    ConsensusResult, DifficultyCalculator, Timestamper, TransactionCreator, ValidatorDependencies,
};
use lc_mempool::TransactionPool;
use parking_lot::{Mutex, RwLock};
use shared_types::{Block, SharedChain, Transaction, TransactionAction};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything the service needs from the node.
pub struct MiningDependencies {
    pub consensus: Arc<ConsensusConfig>,
    pub validation: ValidatorDependencies,
    pub clock: Arc<dyn Timestamper>,
    pub chain: SharedChain,
}

/// Observable counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MiningStatus {
    pub active: bool,
    pub blocks_mined: u64,
    pub blocks_received: u64,
    pub tip_height: Option<u64>,
    pub tip_hash: Option<String>,
    pub last_persisted_height: Option<u64>,
}

/// Node-level block producer.
pub struct MiningService {
    config: MinerConfig,
    consensus: Arc<ConsensusConfig>,
    chain: SharedChain,
    repository: Arc<dyn ChainRepository>,
    validator: Arc<BlockValidator>,
    creator: BlockCreator,
    transactions: TransactionCreator,
    difficulty: Arc<DifficultyCalculator>,
    pool: TransactionPool,
    status: RwLock<MiningStatus>,
    cancel: AtomicBool,
    mining_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MiningService {
    /// # Errors
    /// `ConfigError` if either configuration fails validation.
    pub fn new(deps: MiningDependencies, config: MinerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        deps.consensus.validate()?;

        let consensus = deps.consensus;
        let validator = Arc::new(BlockValidator::new(
            consensus.clone(),
            deps.validation.clone(),
            deps.clock,
        ));
        let pool = TransactionPool::with_config(
            validator.transaction_validator().clone(),
            consensus.network.magic_number.clone(),
            config.pool.clone(),
        );

        let difficulty = Arc::new(DifficultyCalculator::new(
            consensus.seconds_per_block_goal,
            consensus.difficulty_epoch_length,
        ));

        Ok(Self {
            creator: BlockCreator::new(validator.clone(), deps.validation.signer.clone())
                .with_retarget(difficulty.clone()),
            transactions: TransactionCreator::new(
                deps.validation.signer.clone(),
                consensus.network.transaction_version,
            ),
            difficulty,
            repository: deps.validation.repository,
            chain: deps.chain,
            status: RwLock::new(MiningStatus::default()),
            cancel: AtomicBool::new(false),
            mining_handle: Mutex::new(None),
            config,
            consensus,
            validator,
            pool,
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn chain(&self) -> &SharedChain {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn validator(&self) -> &Arc<BlockValidator> {
        &self.validator
    }

    pub fn status(&self) -> MiningStatus {
        self.status.read().clone()
    }

    /// Mine one block on the current tip: a coinbase for the miner followed
    /// by up to `max_transactions_per_block` pool entries.
    ///
    /// Pool entries that no longer validate against the chain are evicted
    /// instead of being mined.
    #[tracing::instrument(skip_all, fields(miner = %self.config.public_key))]
    pub fn mine_next_block(&self, cancel: &AtomicBool) -> MiningResult<Block> {
        let keys = self.config.keys();
        let coinbase = self.transactions.claim_coinbase(
            &keys,
            self.consensus.coinbase_reward,
            self.consensus.fees.minimum_for(TransactionAction::ClaimCoinbase),
        )?;
        let mut transactions = vec![coinbase];
        transactions.extend(self.pending_transactions());

        let difficulty = {
            let chain = self.chain.read();
            self.difficulty
                .block_difficulty(&chain, chain.tip().map(|tip| tip.hash()))?
        };
        debug!(%difficulty, transactions = transactions.len(), "Mining next block");

        let request = BlockRequest::new(
            keys.private_key,
            self.chain.clone(),
            transactions,
            difficulty,
            self.consensus.maximum_target,
        )
        .with_version(self.consensus.network.block_version);
        let mined = self.creator.mine(request, cancel)?;

        self.status.write().blocks_mined += 1;
        self.after_acceptance(&mined.block, &mined.acceptance);
        Ok(mined.block)
    }

    /// Accept a block from elsewhere. The target is the one at the
    /// block's parent, so siblings are held to the same target whatever
    /// their arrival order. The timestamp is checked.
    ///
    /// # Errors
    /// The rejection, unchanged, if the block is not accepted.
    pub fn submit_block(&self, block: Block) -> ConsensusResult<BlockAcceptance> {
        let difficulty = self
            .difficulty
            .block_difficulty(&self.chain.read(), block.header.previous_hash.as_deref())?;
        let target = difficulty.target(self.consensus.maximum_target)?;
        let acceptance = self
            .validator
            .validate_block(&block, target, &self.chain, true, true)?;

        self.status.write().blocks_received += 1;
        self.after_acceptance(&block, &acceptance);
        Ok(acceptance)
    }

    /// Offer a transaction to the pool.
    pub fn submit_transaction(&self, tx: Transaction) -> bool {
        self.pool.add(tx)
    }

    /// Spawn the mining thread. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut handle = self.mining_handle.lock();
        if handle.as_ref().is_some_and(|running| !running.is_finished()) {
            return false;
        }
        if let Some(finished) = handle.take() {
            // ended on its own after a fatal error
            let _ = finished.join();
        }
        self.cancel.store(false, Ordering::SeqCst);
        self.status.write().active = true;

        let service = Arc::clone(self);
        *handle = Some(std::thread::spawn(move || service.run()));
        info!(miner = %self.config.public_key, "Mining started");
        true
    }

    /// Raise the cancellation flag and wait for the mining thread.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        let handle = self.mining_handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Mining thread panicked");
            }
        }
        self.status.write().active = false;
    }

    pub fn is_running(&self) -> bool {
        self.status.read().active
    }

    fn run(&self) {
        loop {
            match self.mine_next_block(&self.cancel) {
                Ok(_) => {}
                Err(MiningError::Cancelled) => break,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Nonce space exhausted, starting a fresh candidate");
                }
                Err(e) => {
                    error!(error = %e, "Mining stopped");
                    break;
                }
            }
        }
        let mined = {
            let mut status = self.status.write();
            status.active = false;
            status.blocks_mined
        };
        info!(blocks_mined = mined, "Mining thread stopped");
    }

    /// Pool entries for the next candidate, re-validated against the chain
    /// and against the entries selected before them.
    fn pending_transactions(&self) -> Vec<Transaction> {
        let validator = self.validator.transaction_validator();
        let net_id = &self.consensus.network.magic_number;
        let mut committed = Commitments::new();
        let mut valid = Vec::new();
        let mut stale = Vec::new();
        for tx in self.pool.take(self.config.max_transactions_per_block) {
            match validator.validate_against(&tx, net_id, &committed) {
                Ok(()) => {
                    committed.record(&tx);
                    valid.push(tx);
                }
                Err(e) => {
                    debug!(error = %e, "Pool entry no longer validates");
                    stale.push(tx);
                }
            }
        }
        for tx in &stale {
            self.pool.remove(tx);
        }
        if !stale.is_empty() {
            warn!(evicted = stale.len(), "Evicted pool entries that no longer validate");
        }
        valid
    }

    fn after_acceptance(&self, block: &Block, acceptance: &BlockAcceptance) {
        self.pool.remove_included(block);
        if let Some(displaced) = acceptance.displaced() {
            let included: HashSet<&str> = block.transactions.iter().map(|tx| tx.hash()).collect();
            let readmitted = self.pool.readmit(
                displaced
                    .transactions
                    .iter()
                    .filter(|tx| !included.contains(tx.hash()))
                    .cloned(),
            );
            info!(displaced = displaced.hash(), readmitted, "Displaced tip returned to pool");
        }

        let height = acceptance.height();
        {
            let mut status = self.status.write();
            status.tip_height = Some(height);
            status.tip_hash = Some(block.hash().to_string());
        }
        if height % self.config.milestone_interval == 0 {
            self.persist(height);
        }
    }

    fn persist(&self, height: u64) {
        // Never call the repository while holding the chain lock.
        let snapshot = self.chain.read().clone();
        match self.repository.update(&snapshot) {
            Ok(()) => {
                self.status.write().last_persisted_height = Some(height);
                info!(height, "Chain persisted at milestone");
            }
            Err(e) => warn!(height, error = %e, "Chain persistence failed"),
        }
    }
}

impl std::fmt::Debug for MiningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningService")
            .field("miner", &self.config.public_key)
            .field("status", &self.status())
            .finish()
    }
}
