//! Adapters layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports.

mod clock;
mod ledger;
mod repository;
mod signer;

pub use clock::{FixedTimestamper, SystemTimestamper};
pub use ledger::{find_sku, supply_balance, token_balance, ChainLedger};
pub use repository::InMemoryChainRepository;
pub use signer::PlaceholderSigner;

use crate::domain::ValidatorDependencies;
use std::sync::Arc;

/// Wire the in-process adapters: placeholder signer, and a chain ledger
/// reading through `repository`.
pub fn in_memory_dependencies(repository: Arc<InMemoryChainRepository>) -> ValidatorDependencies {
    let ledger = Arc::new(ChainLedger::new(repository.clone()));
    ValidatorDependencies {
        signer: Arc::new(PlaceholderSigner),
        repository,
        tokens: ledger.clone(),
        skus: ledger,
    }
}
