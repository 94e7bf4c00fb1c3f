//! Allocation accounting for the in-process engine.

use std::collections::HashMap;
use symbridge_abi::ApproachFrom;

/// Counts of everything the fake engine handed out and took back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    /// Handles issued.
    pub handles_issued: u64,
    /// Handles released through `free_entity`.
    pub handles_freed: u64,
    /// Releases of something already released.
    pub double_frees: u64,
    /// Releases of something never issued.
    pub invalid_frees: u64,
    /// Strings issued.
    pub strings_issued: u64,
    /// Strings released.
    pub strings_freed: u64,
    /// Handle arrays issued, including empty ones.
    pub arrays_issued: u64,
    /// Handle arrays released, including empty ones.
    pub arrays_freed: u64,
    /// Failure records issued.
    pub error_records_issued: u64,
    /// Failure records released.
    pub error_records_freed: u64,
    /// Side passed to the most recent limit call.
    pub last_approach: Option<ApproachFrom>,
    calls: HashMap<&'static str, u64>,
}

impl Ledger {
    /// Handles issued but not yet released.
    pub fn live_handles(&self) -> u64 {
        self.handles_issued - self.handles_freed
    }

    /// Number of calls to `symbol`.
    pub fn calls(&self, symbol: &str) -> u64 {
        self.calls.get(symbol).copied().unwrap_or(0)
    }

    /// Number of calls across every symbol.
    pub fn total_calls(&self) -> u64 {
        self.calls.values().sum()
    }

    /// Returns true if everything issued was released exactly once.
    pub fn is_balanced(&self) -> bool {
        self.live_handles() == 0
            && self.strings_issued == self.strings_freed
            && self.arrays_issued == self.arrays_freed
            && self.error_records_issued == self.error_records_freed
            && self.double_frees == 0
            && self.invalid_frees == 0
    }

    pub(crate) fn record_call(&mut self, symbol: &'static str) {
        *self.calls.entry(symbol).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ledger_is_balanced() {
        let ledger = Ledger::default();
        assert!(ledger.is_balanced());
        assert_eq!(ledger.calls("free_entity"), 0);
    }

    #[test]
    fn counts_calls_per_symbol() {
        let mut ledger = Ledger::default();
        ledger.record_call("entity_nodes");
        ledger.record_call("entity_nodes");
        ledger.record_call("free_entity");

        assert_eq!(ledger.calls("entity_nodes"), 2);
        assert_eq!(ledger.total_calls(), 3);
    }

    #[test]
    fn live_handles_unbalance() {
        let ledger = Ledger {
            handles_issued: 2,
            handles_freed: 1,
            ..Ledger::default()
        };
        assert_eq!(ledger.live_handles(), 1);
        assert!(!ledger.is_balanced());
    }
}
