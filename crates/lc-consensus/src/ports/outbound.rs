//! Driven ports (outbound dependencies)
//!
//! Everything the validators need from the outside world: a clock, a signer,
//! chain storage, and the token and supply ledgers.

use shared_types::{Block, Chain, RepositoryError, SharedChain, Sku};

/// Wall clock in unix seconds.
pub trait Timestamper: Send + Sync {
    fn current_utc_timestamp(&self) -> i64;
}

/// Signature creation and verification over hex hashes.
pub trait Signer: Send + Sync {
    fn signature_is_valid(&self, signature: &str, hash: &str, public_key: &str) -> bool;

    fn create_signature(&self, hash: &str, private_key: &str) -> String;
}

/// Chain storage, addressed by network id.
///
/// Every lookup miss is `RepositoryError::NotFound`.
pub trait ChainRepository: Send + Sync {
    /// The live chain for a network.
    fn get_chain_by_net_id(&self, net_id: &str) -> Result<SharedChain, RepositoryError>;

    fn get_block_by_hash(&self, net_id: &str, block_hash: &str) -> Result<Block, RepositoryError>;

    /// The block containing the transaction with this hash.
    fn get_block_by_transaction_hash(
        &self,
        net_id: &str,
        tx_hash: &str,
    ) -> Result<Block, RepositoryError>;

    fn get_height_for_block(&self, net_id: &str, block_hash: &str) -> Result<u64, RepositoryError>;

    /// Persist a snapshot of a chain.
    fn update(&self, chain: &Chain) -> Result<(), RepositoryError>;

    fn delete(&self, net_id: &str) -> Result<(), RepositoryError>;
}

/// Token balances.
pub trait TokenLedgerReader: Send + Sync {
    fn get_token_balance_for_pub_key(
        &self,
        pub_key: &str,
        net_id: &str,
    ) -> Result<u64, RepositoryError>;
}

/// SKU supply balances and the SKU read model.
pub trait SkuLedgerReader: Send + Sync {
    /// Units of the SKU created by `sku_block_hash#sku_tx_index` held by
    /// `pub_key`.
    fn get_supply_balance_for_pub_key(
        &self,
        pub_key: &str,
        sku_block_hash: &str,
        sku_tx_index: u32,
        net_id: &str,
    ) -> Result<u64, RepositoryError>;

    fn get_sku(
        &self,
        sku_block_hash: &str,
        sku_tx_index: u32,
        net_id: &str,
    ) -> Result<Sku, RepositoryError>;
}
