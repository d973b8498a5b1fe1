//! SKU read model
//!
//! A SKU has no lifecycle of its own: it is the `CreateSku` transaction that
//! introduced it, joined with any later `ChangeSku` payloads.

use serde::{Deserialize, Serialize};

/// Descriptive payload carried in a `CreateSku` transaction's `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuData {
    pub sku_id: String,
    pub ean_code: String,
    pub description: String,
}

impl SkuData {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json(&self) -> String {
        // Only string fields, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A SKU as seen by read paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    /// Block holding the creating transaction.
    pub block_hash: String,
    /// Index of the creating transaction in that block.
    pub tx_index: u32,
    /// Public key of the creator (the SKU owner).
    pub creator: String,
    pub data: SkuData,
    /// Later revisions, oldest first.
    pub changes: Vec<SkuData>,
}

impl Sku {
    /// Most recent description of the SKU.
    pub fn current(&self) -> &SkuData {
        self.changes.last().unwrap_or(&self.data)
    }
}
