//! Engine call statistics.
//!
//! Counters are kept per [`Engine`](crate::Engine) and shared by every
//! clone of it. They are the cheapest way to check the release discipline
//! of a running program:
//!
//! ```rust,ignore
//! let stats = engine.stats();
//! assert_eq!(stats.handles_adopted, stats.handles_released);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for foreign calls and releases.
#[derive(Debug, Default)]
pub struct EngineStats {
    // Call counters
    /// Foreign operations issued (releases excluded).
    foreign_calls: AtomicU64,
    /// Foreign operations that returned a failure record.
    foreign_failures: AtomicU64,

    // Handle counters
    /// Handles taken into ownership.
    handles_adopted: AtomicU64,
    /// Handles handed back with `free_entity`.
    handles_released: AtomicU64,

    // Foreign memory counters
    /// Strings handed back with `free_string`.
    strings_released: AtomicU64,
    /// Arrays handed back with `free_native_array`.
    arrays_released: AtomicU64,
    /// Failure records handed back with `free_error_code`.
    error_records_released: AtomicU64,

    /// Release calls that themselves reported a failure.
    release_failures: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_call(&self) {
        self.foreign_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.foreign_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_adopted(&self) {
        self.handles_adopted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.handles_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_string_released(&self) {
        self.strings_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_array_released(&self) {
        self.arrays_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error_record_released(&self) {
        self.error_records_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release_failure(&self) {
        self.release_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            foreign_calls: self.foreign_calls.load(Ordering::Relaxed),
            foreign_failures: self.foreign_failures.load(Ordering::Relaxed),
            handles_adopted: self.handles_adopted.load(Ordering::Relaxed),
            handles_released: self.handles_released.load(Ordering::Relaxed),
            strings_released: self.strings_released.load(Ordering::Relaxed),
            arrays_released: self.arrays_released.load(Ordering::Relaxed),
            error_records_released: self.error_records_released.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Foreign operations issued.
    pub foreign_calls: u64,
    /// Foreign operations that failed.
    pub foreign_failures: u64,
    /// Handles taken into ownership.
    pub handles_adopted: u64,
    /// Handles released.
    pub handles_released: u64,
    /// Strings released.
    pub strings_released: u64,
    /// Arrays released.
    pub arrays_released: u64,
    /// Failure records released.
    pub error_records_released: u64,
    /// Release calls that failed.
    pub release_failures: u64,
}

impl StatsSnapshot {
    /// Handles adopted but not yet released.
    pub fn live_handles(&self) -> u64 {
        self.handles_adopted.saturating_sub(self.handles_released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = EngineStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn live_handles() {
        let stats = EngineStats::new();
        stats.record_adopted();
        stats.record_adopted();
        stats.record_released();

        let snap = stats.snapshot();
        assert_eq!(snap.handles_adopted, 2);
        assert_eq!(snap.handles_released, 1);
        assert_eq!(snap.live_handles(), 1);
    }

    #[test]
    fn failure_counters() {
        let stats = EngineStats::new();
        stats.record_call();
        stats.record_failure();
        stats.record_error_record_released();
        stats.record_release_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.foreign_calls, 1);
        assert_eq!(snap.foreign_failures, 1);
        assert_eq!(snap.error_records_released, 1);
        assert_eq!(snap.release_failures, 1);
    }
}
