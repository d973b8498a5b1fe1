//! # Core Domain Entities
//!
//! Defines the ledger entities shared by consensus, mempool and block
//! production.
//!
//! ## Clusters
//!
//! - **Sealing**: [`Seal`], the once-only hash/signature attachment
//! - **Blocks**: [`BlockHeader`], [`Block`]
//! - **Transactions**: [`Transaction`], [`BasicTransaction`],
//!   [`StateTransaction`], [`TransactionAction`]
//!
//! Hashes and public keys are carried as text (uppercase hex digests and
//! opaque key strings) because their textual form is what gets encoded and
//! hashed.

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: SEALING
// =============================================================================

/// Finalization state of a header or transaction.
///
/// A seal starts `Open` and moves to `Finalized` exactly once. There is no
/// transition back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Seal {
    /// Hash and signature not yet attached.
    #[default]
    Open,
    /// Hash and signature attached.
    Finalized {
        /// Uppercase hex SHA-256 digest.
        hash: String,
        /// Signature over `hash`.
        signature: String,
    },
}

impl Seal {
    /// Attach hash and signature. Fails if already finalized.
    pub fn finalize(&mut self, hash: String, signature: String) -> Result<(), ModelError> {
        if matches!(self, Seal::Finalized { .. }) {
            return Err(ModelError::AlreadyFinalized);
        }
        *self = Seal::Finalized { hash, signature };
        Ok(())
    }

    /// True iff both hash and signature are present and non-empty.
    pub fn is_finalized(&self) -> bool {
        match self {
            Seal::Open => false,
            Seal::Finalized { hash, signature } => !hash.is_empty() && !signature.is_empty(),
        }
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Seal::Finalized { hash, .. } => Some(hash),
            Seal::Open => None,
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Seal::Finalized { signature, .. } => Some(signature),
            Seal::Open => None,
        }
    }
}

// =============================================================================
// CLUSTER B: BLOCKS
// =============================================================================

/// The header of a block.
///
/// The nonce may only move while the seal is open; once finalized the
/// header is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Network identifier ("magic number").
    pub magic_number: String,
    /// Protocol version.
    pub version: u32,
    /// Merkle root of the block's transactions.
    pub merkle_root: String,
    /// Unix seconds at which mining of this block started.
    pub timestamp: i64,
    /// Hash of the previous block. `None` only for genesis.
    pub previous_hash: Option<String>,
    nonce: u64,
    seal: Seal,
}

impl BlockHeader {
    /// Create an open header with nonce 0.
    pub fn new(
        magic_number: impl Into<String>,
        version: u32,
        merkle_root: impl Into<String>,
        timestamp: i64,
        previous_hash: Option<String>,
    ) -> Self {
        Self {
            magic_number: magic_number.into(),
            version,
            merkle_root: merkle_root.into(),
            timestamp,
            previous_hash,
            nonce: 0,
            seal: Seal::Open,
        }
    }

    /// Start the nonce at a specific value.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Advance the nonce by one.
    ///
    /// # Errors
    /// - `AlreadyFinalized` if the header is sealed
    /// - `NonceLimitReached` if the nonce is already `u64::MAX`
    pub fn increment_nonce(&mut self) -> Result<u64, ModelError> {
        if !matches!(self.seal, Seal::Open) {
            return Err(ModelError::AlreadyFinalized);
        }
        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or(ModelError::NonceLimitReached)?;
        Ok(self.nonce)
    }

    /// Attach hash and signature (at most once).
    pub fn finalize(&mut self, hash: String, signature: String) -> Result<(), ModelError> {
        self.seal.finalize(hash, signature)
    }

    pub fn is_finalized(&self) -> bool {
        self.seal.is_finalized()
    }

    pub fn seal(&self) -> &Seal {
        &self.seal
    }

    /// Recorded hash, empty if not finalized.
    pub fn hash(&self) -> &str {
        self.seal.hash().unwrap_or_default()
    }

    /// Recorded signature, empty if not finalized.
    pub fn signature(&self) -> &str {
        self.seal.signature().unwrap_or_default()
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_none()
    }
}

/// A block: header plus owned, ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Shorthand for the header hash.
    pub fn hash(&self) -> &str {
        self.header.hash()
    }
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// What a transaction does.
///
/// Encoded by name. Names not known to this node decode as `Unknown` so that
/// validation can reject them instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionAction {
    ClaimCoinbase,
    TransferToken,
    CreateSku,
    ChangeSku,
    CreateSupply,
    TransferSupply,
    DestroySupply,
    #[serde(other)]
    Unknown,
}

impl TransactionAction {
    /// Actions that reference a SKU-creation transaction.
    pub fn references_sku(&self) -> bool {
        matches!(
            self,
            Self::ChangeSku | Self::CreateSupply | Self::TransferSupply | Self::DestroySupply
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaimCoinbase => "ClaimCoinbase",
            Self::TransferToken => "TransferToken",
            Self::CreateSku => "CreateSku",
            Self::ChangeSku => "ChangeSku",
            Self::CreateSupply => "CreateSupply",
            Self::TransferSupply => "TransferSupply",
            Self::DestroySupply => "DestroySupply",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every transaction carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicTransaction {
    pub version: u32,
    pub action: TransactionAction,
    /// Free-text payload (JSON for `CreateSku`).
    pub data: Option<String>,
    pub fee: u64,
    #[serde(default)]
    pub seal: Seal,
}

/// A ledger-state transaction (tokens and SKU supply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransaction {
    pub base: BasicTransaction,
    pub from_pub_key: Option<String>,
    pub to_pub_key: Option<String>,
    /// Block containing the referenced `CreateSku` transaction.
    pub sku_block_hash: Option<String>,
    /// Index of the referenced `CreateSku` transaction in that block.
    pub sku_tx_index: u32,
    pub amount: u64,
}

impl StateTransaction {
    /// Create an open state transaction with no SKU reference.
    pub fn new(
        version: u32,
        action: TransactionAction,
        from_pub_key: Option<String>,
        to_pub_key: Option<String>,
        amount: u64,
        fee: u64,
        data: Option<String>,
    ) -> Self {
        Self {
            base: BasicTransaction {
                version,
                action,
                data,
                fee,
                seal: Seal::Open,
            },
            from_pub_key,
            to_pub_key,
            sku_block_hash: None,
            sku_tx_index: 0,
            amount,
        }
    }

    /// Point this transaction at a SKU-creation transaction.
    pub fn with_sku_reference(mut self, block_hash: impl Into<String>, tx_index: u32) -> Self {
        self.sku_block_hash = Some(block_hash.into());
        self.sku_tx_index = tx_index;
        self
    }
}

/// Any transaction that can appear in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Transaction {
    /// Shape without ledger-state fields. Never valid on this network.
    Basic(BasicTransaction),
    State(StateTransaction),
}

impl Transaction {
    pub fn base(&self) -> &BasicTransaction {
        match self {
            Transaction::Basic(base) => base,
            Transaction::State(tx) => &tx.base,
        }
    }

    fn base_mut(&mut self) -> &mut BasicTransaction {
        match self {
            Transaction::Basic(base) => base,
            Transaction::State(tx) => &mut tx.base,
        }
    }

    pub fn as_state(&self) -> Option<&StateTransaction> {
        match self {
            Transaction::State(tx) => Some(tx),
            Transaction::Basic(_) => None,
        }
    }

    pub fn action(&self) -> TransactionAction {
        self.base().action
    }

    pub fn is_coinbase(&self) -> bool {
        self.action() == TransactionAction::ClaimCoinbase
    }

    /// Attach hash and signature (at most once).
    pub fn finalize(&mut self, hash: String, signature: String) -> Result<(), ModelError> {
        self.base_mut().seal.finalize(hash, signature)
    }

    pub fn is_finalized(&self) -> bool {
        self.base().seal.is_finalized()
    }

    /// Recorded hash, empty if not finalized.
    pub fn hash(&self) -> &str {
        self.base().seal.hash().unwrap_or_default()
    }

    /// Recorded signature, empty if not finalized.
    pub fn signature(&self) -> &str {
        self.base().seal.signature().unwrap_or_default()
    }
}

impl From<StateTransaction> for Transaction {
    fn from(tx: StateTransaction) -> Self {
        Transaction::State(tx)
    }
}
