//! Builds finalized, signed transactions.

use super::codec;
use crate::ports::Signer;
use shared_types::{ModelError, SkuData, StateTransaction, Transaction, TransactionAction};
use std::sync::Arc;

/// Public/private key strings of one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl KeyPair {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

/// Reference to the `CreateSku` transaction that introduced a SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuRef<'a> {
    pub block_hash: &'a str,
    pub tx_index: u32,
}

pub struct TransactionCreator {
    signer: Arc<dyn Signer>,
    version: u32,
}

impl TransactionCreator {
    pub fn new(signer: Arc<dyn Signer>, version: u32) -> Self {
        Self { signer, version }
    }

    /// Hash with the codec, sign with `private_key`, and seal.
    pub fn finalize(
        &self,
        tx: impl Into<Transaction>,
        private_key: &str,
    ) -> Result<Transaction, ModelError> {
        let mut tx = tx.into();
        let hash = codec::transaction_hash(&tx);
        let signature = self.signer.create_signature(&hash, private_key);
        tx.finalize(hash, signature)?;
        Ok(tx)
    }

    fn state(
        &self,
        action: TransactionAction,
        from: Option<&KeyPair>,
        to: Option<&str>,
        amount: u64,
        fee: u64,
    ) -> StateTransaction {
        StateTransaction::new(
            self.version,
            action,
            from.map(|k| k.public_key.clone()),
            to.map(String::from),
            amount,
            fee,
            None,
        )
    }

    /// Reward claim to `miner`, signed by the miner.
    pub fn claim_coinbase(
        &self,
        miner: &KeyPair,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let tx = self.state(
            TransactionAction::ClaimCoinbase,
            None,
            Some(&miner.public_key),
            amount,
            fee,
        );
        self.finalize(tx, &miner.private_key)
    }

    pub fn transfer_token(
        &self,
        from: &KeyPair,
        to: &str,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let tx = self.state(TransactionAction::TransferToken, Some(from), Some(to), amount, fee);
        self.finalize(tx, &from.private_key)
    }

    pub fn create_sku(
        &self,
        from: &KeyPair,
        data: &SkuData,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let mut tx = self.state(TransactionAction::CreateSku, Some(from), None, 0, fee);
        tx.base.data = Some(data.to_json());
        self.finalize(tx, &from.private_key)
    }

    pub fn create_supply(
        &self,
        from: &KeyPair,
        sku: SkuRef<'_>,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let tx = self
            .state(TransactionAction::CreateSupply, Some(from), None, amount, fee)
            .with_sku_reference(sku.block_hash, sku.tx_index);
        self.finalize(tx, &from.private_key)
    }

    pub fn transfer_supply(
        &self,
        from: &KeyPair,
        to: &str,
        sku: SkuRef<'_>,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let tx = self
            .state(TransactionAction::TransferSupply, Some(from), Some(to), amount, fee)
            .with_sku_reference(sku.block_hash, sku.tx_index);
        self.finalize(tx, &from.private_key)
    }

    pub fn destroy_supply(
        &self,
        from: &KeyPair,
        sku: SkuRef<'_>,
        amount: u64,
        fee: u64,
    ) -> Result<Transaction, ModelError> {
        let tx = self
            .state(TransactionAction::DestroySupply, Some(from), None, amount, fee)
            .with_sku_reference(sku.block_hash, sku.tx_index);
        self.finalize(tx, &from.private_key)
    }
}
