//! Pipeline and pool metrics for observability
//!
//! Provides counters for monitoring logger health: how many events were
//! written or filtered out, how many faults were reported, and how well the
//! object pools are reusing instances.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_event_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_written();
/// metrics.record_pre_filtered();
///
/// assert_eq!(metrics.events_written(), 1);
/// assert_eq!(metrics.pre_filtered(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events handed to the destination writer
    events_written: AtomicU64,

    /// Events rejected before a record was acquired
    pre_filtered: AtomicU64,

    /// Events rejected after enrichment
    post_filtered: AtomicU64,

    /// Faults handed to the error policy
    faults_reported: AtomicU64,

    /// Faults the error policy chose to suppress
    faults_suppressed: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            events_written: AtomicU64::new(0),
            pre_filtered: AtomicU64::new(0),
            post_filtered: AtomicU64::new(0),
            faults_reported: AtomicU64::new(0),
            faults_suppressed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_written(&self) -> u64 {
        self.events_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pre_filtered(&self) -> u64 {
        self.pre_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn post_filtered(&self) -> u64 {
        self.post_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn faults_reported(&self) -> u64 {
        self.faults_reported.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn faults_suppressed(&self) -> u64 {
        self.faults_suppressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.events_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written_batch(&self, count: u64) -> u64 {
        self.events_written.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pre_filtered(&self) -> u64 {
        self.pre_filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_post_filtered(&self) -> u64 {
        self.post_filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_fault(&self, suppressed: bool) -> u64 {
        if suppressed {
            self.faults_suppressed.fetch_add(1, Ordering::Relaxed);
        }
        self.faults_reported.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of events (0.0 - 100.0) that were filtered out at either stage
    ///
    /// Returns 0.0 if no events have been seen.
    pub fn filter_rate(&self) -> f64 {
        let filtered = (self.pre_filtered() + self.post_filtered()) as f64;
        let total = self.events_written() as f64 + filtered;
        if total == 0.0 {
            0.0
        } else {
            (filtered / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.events_written.store(0, Ordering::Relaxed);
        self.pre_filtered.store(0, Ordering::Relaxed);
        self.post_filtered.store(0, Ordering::Relaxed);
        self.faults_reported.store(0, Ordering::Relaxed);
        self.faults_suppressed.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            events_written: AtomicU64::new(self.events_written()),
            pre_filtered: AtomicU64::new(self.pre_filtered()),
            post_filtered: AtomicU64::new(self.post_filtered()),
            faults_reported: AtomicU64::new(self.faults_reported()),
            faults_suppressed: AtomicU64::new(self.faults_suppressed()),
        }
    }
}

/// Counters for an object pool
#[derive(Debug)]
pub struct PoolMetrics {
    /// Successful take calls
    taken: AtomicU64,

    /// Instances built by the factory
    created: AtomicU64,

    /// Instances placed back in the idle cache
    recycled: AtomicU64,

    /// Returned instances discarded because the cache was full or closed
    discarded: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            taken: AtomicU64::new(0),
            created: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn taken(&self) -> u64 {
        self.taken.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn recycled(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_take(&self, created: bool) {
        self.taken.fetch_add(1, Ordering::Relaxed);
        if created {
            self.created.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_recycled(&self) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of takes (0.0 - 1.0) served from the idle cache
    ///
    /// Returns 1.0 if nothing has been taken yet.
    pub fn reuse_ratio(&self) -> f64 {
        let taken = self.taken() as f64;
        if taken == 0.0 {
            1.0
        } else {
            (taken - self.created() as f64) / taken
        }
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PoolMetrics {
    fn clone(&self) -> Self {
        Self {
            taken: AtomicU64::new(self.taken()),
            created: AtomicU64::new(self.created()),
            recycled: AtomicU64::new(self.recycled()),
            discarded: AtomicU64::new(self.discarded()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.events_written(), 0);
        assert_eq!(metrics.pre_filtered(), 0);
        assert_eq!(metrics.post_filtered(), 0);
        assert_eq!(metrics.faults_reported(), 0);
        assert_eq!(metrics.faults_suppressed(), 0);
    }

    #[test]
    fn test_record_fault() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_fault(true), 0); // Returns previous value
        metrics.record_fault(false);
        assert_eq!(metrics.faults_reported(), 2);
        assert_eq!(metrics.faults_suppressed(), 1);
    }

    #[test]
    fn test_filter_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.filter_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_written();
        }
        for _ in 0..5 {
            metrics.record_pre_filtered();
            metrics.record_post_filtered();
        }

        let rate = metrics.filter_rate();
        assert!((9.9..=10.1).contains(&rate), "Filter rate was {}", rate);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_written();

        let snapshot = metrics.clone();
        metrics.record_written();

        assert_eq!(metrics.events_written(), 2);
        assert_eq!(snapshot.events_written(), 1);
    }

    #[test]
    fn test_pool_reuse_ratio() {
        let metrics = PoolMetrics::new();
        assert_eq!(metrics.reuse_ratio(), 1.0);

        metrics.record_take(true);
        metrics.record_take(false);
        metrics.record_take(false);
        metrics.record_take(false);

        assert_eq!(metrics.taken(), 4);
        assert_eq!(metrics.created(), 1);
        assert!((metrics.reuse_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
