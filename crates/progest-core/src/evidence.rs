//! Size evidence from the sizing pass and live totals from the transfer pass.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of the evidence (dry-run) pass: bytes in new files and in changed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub new_bytes: u64,
    pub changed_bytes: u64,
}

impl Evidence {
    pub fn new(new_bytes: u64, changed_bytes: u64) -> Self {
        Self {
            new_bytes,
            changed_bytes,
        }
    }

    /// Total amount of changing data the sizing pass found.
    pub fn total(&self) -> u64 {
        self.new_bytes.saturating_add(self.changed_bytes)
    }
}

/// Totals observed so far during the live pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveTotals {
    /// Size of the raw (uncompressed, unencrypted) delta stream produced so far.
    pub raw_delta_size: u64,
    /// New plus changed file bytes processed so far.
    pub changed_plus_new: u64,
}

/// The size-tracking collaborator, queried once per reporting tick.
pub trait LiveSizes: Send + Sync {
    fn live_totals(&self) -> LiveTotals;
}

/// Lock-free live totals the delta producer updates while it walks files.
#[derive(Debug, Default)]
pub struct SharedLiveTotals {
    raw_delta_size: AtomicU64,
    changed_plus_new: AtomicU64,
}

impl SharedLiveTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw_delta_size(&self, bytes: u64) {
        self.raw_delta_size.store(bytes, Ordering::Relaxed);
    }

    pub fn add_raw_delta(&self, bytes: u64) {
        saturating_add(&self.raw_delta_size, bytes);
    }

    pub fn set_changed_plus_new(&self, bytes: u64) {
        self.changed_plus_new.store(bytes, Ordering::Relaxed);
    }

    pub fn add_changed_plus_new(&self, bytes: u64) {
        saturating_add(&self.changed_plus_new, bytes);
    }
}

impl LiveSizes for SharedLiveTotals {
    fn live_totals(&self) -> LiveTotals {
        LiveTotals {
            raw_delta_size: self.raw_delta_size.load(Ordering::Relaxed),
            changed_plus_new: self.changed_plus_new.load(Ordering::Relaxed),
        }
    }
}

/// Add to an atomic counter, pinning at `u64::MAX` instead of wrapping.
pub(crate) fn saturating_add(counter: &AtomicU64, bytes: u64) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |current| {
        Some(current.saturating_add(bytes))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_total_saturates() {
        assert_eq!(Evidence::new(10, 32).total(), 42);
        assert_eq!(Evidence::new(u64::MAX, 1).total(), u64::MAX);
    }

    #[test]
    fn shared_totals_accumulate() {
        let live = SharedLiveTotals::new();
        live.add_raw_delta(100);
        live.add_raw_delta(50);
        live.add_changed_plus_new(400);
        assert_eq!(
            live.live_totals(),
            LiveTotals {
                raw_delta_size: 150,
                changed_plus_new: 400
            }
        );
        live.set_raw_delta_size(7);
        assert_eq!(live.live_totals().raw_delta_size, 7);
        live.add_changed_plus_new(u64::MAX);
        assert_eq!(live.live_totals().changed_plus_new, u64::MAX);
    }
}
