//! Configuration types for block production

use lc_consensus::{ConfigError, KeyPair};
use lc_mempool::MempoolConfig;
use serde::Deserialize;

/// Runtime configuration for the mining service
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Receives coinbase rewards
    pub public_key: String,

    /// Signs coinbase claims and mined blocks
    pub private_key: String,

    /// Pool entries per block, coinbase not counted
    pub max_transactions_per_block: usize,

    /// Persist the chain every time the tip height is a multiple of this
    pub milestone_interval: u64,

    pub pool: MempoolConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            private_key: String::new(),
            max_transactions_per_block: 100,
            milestone_interval: 10,
            pool: MempoolConfig::default(),
        }
    }
}

impl MinerConfig {
    /// Defaults with the given mining keys.
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> KeyPair {
        KeyPair::new(self.public_key.clone(), self.private_key.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public_key.is_empty() || self.private_key.is_empty() {
            return Err(ConfigError::Invalid("miner keys must not be empty".into()));
        }
        if self.milestone_interval == 0 {
            return Err(ConfigError::Invalid(
                "milestone_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
