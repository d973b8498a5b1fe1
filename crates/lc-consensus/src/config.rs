//! Configuration types for consensus

use primitive_types::U256;
use serde::Deserialize;
use shared_types::TransactionAction;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration for validation and difficulty
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub network: NetworkParams,

    /// Maximum distance between a block timestamp and now, inclusive
    pub max_timestamp_offset_secs: i64,

    /// Desired time between blocks
    pub seconds_per_block_goal: u64,

    /// Blocks per difficulty epoch
    pub difficulty_epoch_length: u64,

    /// Target at difficulty 1 (easiest allowed)
    pub maximum_target: U256,

    pub fees: FeeSchedule,

    /// Upper bound on a coinbase claim
    pub coinbase_reward: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            network: NetworkParams::default(),
            max_timestamp_offset_secs: 120,
            seconds_per_block_goal: 15,
            difficulty_epoch_length: 10,
            maximum_target: default_maximum_target(),
            fees: FeeSchedule::default(),
            coinbase_reward: 50,
        }
    }
}

/// `0x0000FFFF...FF`: two leading zero bytes.
pub fn default_maximum_target() -> U256 {
    U256::MAX >> 16
}

impl ConsensusConfig {
    /// Defaults with a different network id.
    pub fn for_network(magic_number: impl Into<String>) -> Self {
        Self {
            network: NetworkParams {
                magic_number: magic_number.into(),
                ..NetworkParams::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.magic_number.is_empty() {
            return Err(ConfigError::Invalid("magic number must not be empty".into()));
        }
        if self.difficulty_epoch_length == 0 {
            return Err(ConfigError::Invalid("difficulty epoch length must be positive".into()));
        }
        if self.seconds_per_block_goal == 0 {
            return Err(ConfigError::Invalid("block time goal must be positive".into()));
        }
        if self.maximum_target.is_zero() {
            return Err(ConfigError::Invalid("maximum target must be positive".into()));
        }
        if self.max_timestamp_offset_secs < 0 {
            return Err(ConfigError::Invalid("timestamp offset must not be negative".into()));
        }
        Ok(())
    }
}

/// Network identity and protocol versions
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkParams {
    pub magic_number: String,
    pub block_version: u32,
    pub transaction_version: u32,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            magic_number: "testnet".into(),
            block_version: 1,
            transaction_version: 1,
        }
    }
}

/// Minimum fee per action
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeeSchedule {
    pub claim_coinbase: u64,
    pub transfer_token: u64,
    pub create_sku: u64,
    pub change_sku: u64,
    pub create_supply: u64,
    pub transfer_supply: u64,
    pub destroy_supply: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            claim_coinbase: 0,
            transfer_token: 1,
            create_sku: 1,
            change_sku: 1,
            create_supply: 1,
            transfer_supply: 1,
            destroy_supply: 1,
        }
    }
}

impl FeeSchedule {
    pub fn minimum_for(&self, action: TransactionAction) -> u64 {
        match action {
            TransactionAction::ClaimCoinbase => self.claim_coinbase,
            TransactionAction::TransferToken => self.transfer_token,
            TransactionAction::CreateSku => self.create_sku,
            TransactionAction::ChangeSku => self.change_sku,
            TransactionAction::CreateSupply => self.create_supply,
            TransactionAction::TransferSupply => self.transfer_supply,
            TransactionAction::DestroySupply => self.destroy_supply,
            TransactionAction::Unknown => u64::MAX,
        }
    }
}
