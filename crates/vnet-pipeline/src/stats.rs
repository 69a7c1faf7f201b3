//! Pipeline counters.
//!
//! Counters are monotonic and updated with relaxed atomics: they have no
//! ordering dependency on queue contents, so readers never contend with the
//! pipeline lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only snapshot of the pipeline counters.
///
/// Individual fields are each internally consistent; a snapshot taken while
/// the pipeline is running may straddle in-flight operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames accepted by the transmit path.
    pub accepted: u64,
    pub accepted_bytes: u64,

    /// Frames handed to the downstream sink by the poll engine.
    pub delivered: u64,
    pub delivered_bytes: u64,

    /// Submissions rejected because the queue was at capacity.
    pub dropped_full: u64,
    pub dropped_full_bytes: u64,

    /// Submissions rejected while flow control was stopped.
    pub dropped_stopped: u64,
    pub dropped_stopped_bytes: u64,

    /// Submissions rejected for exceeding the maximum frame length.
    pub dropped_oversize: u64,
    pub dropped_oversize_bytes: u64,

    /// Accepted frames discarded by `purge`/`close` without delivery.
    pub purged: u64,
}

impl PipelineStats {
    /// Total dropped submissions across all reasons.
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_stopped + self.dropped_oversize
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    accepted: AtomicU64,
    accepted_bytes: AtomicU64,
    delivered: AtomicU64,
    delivered_bytes: AtomicU64,
    dropped_full: AtomicU64,
    dropped_full_bytes: AtomicU64,
    dropped_stopped: AtomicU64,
    dropped_stopped_bytes: AtomicU64,
    dropped_oversize: AtomicU64,
    dropped_oversize_bytes: AtomicU64,
    purged: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_accepted(&self, len: usize) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.accepted_bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, len: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.delivered_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_full(&self, len: usize) {
        self.dropped_full.fetch_add(1, Ordering::Relaxed);
        self.dropped_full_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_stopped(&self, len: usize) {
        self.dropped_stopped.fetch_add(1, Ordering::Relaxed);
        self.dropped_stopped_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_oversize(&self, len: usize) {
        self.dropped_oversize.fetch_add(1, Ordering::Relaxed);
        self.dropped_oversize_bytes
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_purged(&self, frames: u64) {
        self.purged.fetch_add(frames, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            accepted_bytes: self.accepted_bytes.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivered_bytes: self.delivered_bytes.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_full_bytes: self.dropped_full_bytes.load(Ordering::Relaxed),
            dropped_stopped: self.dropped_stopped.load(Ordering::Relaxed),
            dropped_stopped_bytes: self.dropped_stopped_bytes.load(Ordering::Relaxed),
            dropped_oversize: self.dropped_oversize.load(Ordering::Relaxed),
            dropped_oversize_bytes: self.dropped_oversize_bytes.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let counters = StatCounters::default();
        counters.record_accepted(100);
        counters.record_accepted(50);
        counters.record_delivered(100);
        counters.record_dropped_full(10);
        counters.record_dropped_stopped(20);
        counters.record_dropped_oversize(2000);
        counters.record_purged(1);

        let stats = counters.snapshot();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.accepted_bytes, 150);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.delivered_bytes, 100);
        assert_eq!(stats.dropped_full, 1);
        assert_eq!(stats.dropped_stopped, 1);
        assert_eq!(stats.dropped_oversize, 1);
        assert_eq!(stats.dropped_oversize_bytes, 2000);
        assert_eq!(stats.purged, 1);
        assert_eq!(stats.dropped(), 3);
    }
}
