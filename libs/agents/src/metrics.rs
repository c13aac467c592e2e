//! Per-agent delivery counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AgentMetrics {
    /// Handler invocations that returned Ok
    pub delivered: AtomicU64,
    /// Handler invocations that returned Err
    pub failed: AtomicU64,
    /// Messages buffered instead of handled on the caller's stack
    pub deferred: AtomicU64,
}

impl AgentMetrics {
    pub fn record_handled(&self, ok: bool) {
        if ok {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub deferred: u64,
}
