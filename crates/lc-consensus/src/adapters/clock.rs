//! Clock adapters

use crate::ports::Timestamper;
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall clock via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimestamper;

impl Timestamper for SystemTimestamper {
    fn current_utc_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to (for testing).
#[derive(Debug, Default)]
pub struct FixedTimestamper {
    now: AtomicI64,
}

impl FixedTimestamper {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Timestamper for FixedTimestamper {
    fn current_utc_timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
