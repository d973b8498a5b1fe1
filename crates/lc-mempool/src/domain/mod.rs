//! Domain layer for the transaction pool

mod errors;
mod pool;

pub use errors::*;
pub use pool::*;
