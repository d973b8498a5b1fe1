//! Chain state
//!
//! The ordered sequence of accepted blocks for one network, plus a
//! hash → height index for quick lookups.
//!
//! The only mutations are [`Chain::push_block`] and [`Chain::replace_tip`].

use crate::entities::Block;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A chain shared between the miner and block intake.
pub type SharedChain = Arc<RwLock<Chain>>;

/// Accepted blocks of one network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ChainRecord", into = "ChainRecord")]
pub struct Chain {
    magic_number: String,
    blocks: Vec<Block>,
    /// Block hash to height mapping
    height_index: HashMap<String, usize>,
}

impl Chain {
    /// Create an empty ("genesis state") chain.
    pub fn new(magic_number: impl Into<String>) -> Self {
        Self {
            magic_number: magic_number.into(),
            blocks: Vec::new(),
            height_index: HashMap::new(),
        }
    }

    /// Build a chain from already-accepted blocks without validating them.
    pub fn from_blocks(magic_number: impl Into<String>, blocks: Vec<Block>) -> Self {
        let mut chain = Self::new(magic_number);
        for block in blocks {
            chain.push_block(block);
        }
        chain
    }

    /// Wrap into a lock for sharing.
    pub fn into_shared(self) -> SharedChain {
        Arc::new(RwLock::new(self))
    }

    pub fn magic_number(&self) -> &str {
        &self.magic_number
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Height of the tip, `-1` for an empty chain.
    pub fn current_height(&self) -> i64 {
        self.blocks.len() as i64 - 1
    }

    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        usize::try_from(height).ok().and_then(|h| self.blocks.get(h))
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.height_index.get(hash).map(|&h| &self.blocks[h])
    }

    pub fn height_of(&self, hash: &str) -> Option<u64> {
        self.height_index.get(hash).map(|&h| h as u64)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.height_index.contains_key(hash)
    }

    /// Blocks whose previous hash equals `previous_hash`, with their heights.
    pub fn blocks_with_previous_hash<'a>(
        &'a self,
        previous_hash: &'a str,
    ) -> impl Iterator<Item = (u64, &'a Block)> + 'a {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.header.previous_hash.as_deref() == Some(previous_hash))
            .map(|(h, b)| (h as u64, b))
    }

    /// Append a block at the tip. Returns its height.
    pub fn push_block(&mut self, block: Block) -> u64 {
        let height = self.blocks.len();
        self.height_index.insert(block.hash().to_string(), height);
        self.blocks.push(block);
        height as u64
    }

    /// Replace the tip block. Returns the displaced block, or `None` (and
    /// appends) if the chain was empty.
    pub fn replace_tip(&mut self, block: Block) -> Option<Block> {
        let displaced = self.blocks.pop();
        if let Some(old) = &displaced {
            self.height_index.remove(old.hash());
        }
        self.push_block(block);
        displaced
    }
}

/// Persisted form: the index is derived and not stored.
#[derive(Serialize, Deserialize)]
struct ChainRecord {
    magic_number: String,
    blocks: Vec<Block>,
}

impl From<ChainRecord> for Chain {
    fn from(record: ChainRecord) -> Self {
        Chain::from_blocks(record.magic_number, record.blocks)
    }
}

impl From<Chain> for ChainRecord {
    fn from(chain: Chain) -> Self {
        ChainRecord {
            magic_number: chain.magic_number,
            blocks: chain.blocks,
        }
    }
}
