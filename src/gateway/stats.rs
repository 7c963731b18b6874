use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of gateway counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    /// Messages accepted by some provider
    pub sent: u64,
    /// Messages no provider accepted
    pub failed: u64,
    /// Failover advances to a next provider
    pub retried: u64,
}

/// Process-lifetime counters.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    sent: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

impl StatsCounters {
    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GatewayStats {
        GatewayStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }
}
