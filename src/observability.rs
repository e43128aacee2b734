//! Process-wide pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated across all batches handled by this process
#[derive(Debug, Default)]
pub struct Metrics {
    batches_processed: AtomicU64,
    batches_failed: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    items_skipped: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_processed(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_succeeded(&self) {
        self.items_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub batches_processed: u64,
    pub batches_failed: u64,
    pub items_succeeded: u64,
    pub items_failed: u64,
    pub items_skipped: u64,
}
