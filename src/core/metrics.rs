//! Logger metrics for observability
//!
//! Counts entries handed to the store and entries the store rejected.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_logit::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_logged();
/// metrics.record_failed();
///
/// assert_eq!(metrics.total_logged(), 1);
/// assert_eq!(metrics.failed_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Entries accepted by the store
    total_logged: AtomicU64,

    /// Entries the store refused
    failed_count: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Record an accepted entry, returning the previous count
    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a rejected entry, returning the previous count
    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Percentage of store writes that failed
    pub fn failure_rate(&self) -> f64 {
        let logged = self.total_logged();
        let failed = self.failed_count();
        let total = logged + failed;

        if total == 0 {
            0.0
        } else {
            (failed as f64 / total as f64) * 100.0
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.failed_count.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
