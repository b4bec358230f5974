//! Per-actor statistics.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, TimeZone, Utc};

// Layer 3: Internal module imports
use crate::message::envelope::now_ns;

/// Atomic counters owned by one actor cell; written only by the (serial)
/// processing task, read from anywhere.
#[derive(Debug, Default)]
pub struct ActorStats {
    processed: AtomicU64,
    failed: AtomicU64,
    restarts: AtomicU32,
    last_message_ns: AtomicU64,
    processing_ns: AtomicU64,
}

impl ActorStats {
    /// Account one successfully handled message and the time its handler
    /// took.
    pub fn record_processed(&self, elapsed_ns: u64) {
        // Relaxed throughout: counters are diagnostics, no ordering needed.
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.processing_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        self.last_message_ns.store(now_ns(), Ordering::Relaxed);
    }

    /// Account one failed `receive`.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Account one supervised restart.
    pub fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the message counters (restart semantics keep the restart
    /// count itself).
    pub fn reset_message_counters(&self) {
        self.processed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.last_message_ns.store(0, Ordering::Relaxed);
        self.processing_ns.store(0, Ordering::Relaxed);
    }

    /// Point-in-time snapshot.
    pub fn snapshot(&self) -> ActorStatsSnapshot {
        let last_ns = self.last_message_ns.load(Ordering::Relaxed);
        ActorStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            processing_ns: self.processing_ns.load(Ordering::Relaxed),
            last_message_at: (last_ns > 0)
                .then(|| Utc.timestamp_nanos(last_ns as i64)),
        }
    }
}

/// Snapshot of one actor's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorStatsSnapshot {
    /// Messages handled successfully.
    pub processed: u64,
    /// `receive` failures.
    pub failed: u64,
    /// Supervised restarts over the actor's lifetime.
    pub restarts: u32,
    /// Cumulative nanoseconds spent inside `receive` for the processed
    /// messages.
    pub processing_ns: u64,
    /// Wall-clock stamp of the most recent handled message.
    pub last_message_at: Option<DateTime<Utc>>,
}

impl ActorStatsSnapshot {
    /// Mean handler time per processed message.
    pub fn mean_processing_ns(&self) -> u64 {
        if self.processed == 0 {
            0
        } else {
            self.processing_ns / self.processed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = ActorStats::default();
        stats.record_processed(100);
        stats.record_processed(300);
        stats.record_failure();
        stats.record_restart();

        let snap = stats.snapshot();
        assert_eq!(snap.processed, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.restarts, 1);
        assert_eq!(snap.processing_ns, 400);
        assert_eq!(snap.mean_processing_ns(), 200);
        assert!(snap.last_message_at.is_some());
    }

    #[test]
    fn test_reset_keeps_restarts() {
        let stats = ActorStats::default();
        stats.record_processed(50);
        stats.record_restart();
        stats.reset_message_counters();

        let snap = stats.snapshot();
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.restarts, 1);
        assert_eq!(snap.processing_ns, 0);
        assert!(snap.last_message_at.is_none());
    }

    #[test]
    fn test_mean_of_nothing_is_zero() {
        let snap = ActorStats::default().snapshot();
        assert_eq!(snap.mean_processing_ns(), 0);
    }
}
