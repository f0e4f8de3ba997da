//! Minimal in-process counters for the id-generation subsystem
//!
//! Deliberately just `AtomicU64` counters with a snapshot struct: no
//! external metrics-exporter dependency, matching the grounding crate's own
//! bare-bones approach to in-process counting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time read of [`Metrics`]'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total successful mints, direct or cached.
    pub mints: u64,
    /// Ids served straight from the ring buffer.
    pub cache_hits: u64,
    /// Takes that found the ring buffer empty.
    pub cache_misses: u64,
    /// Puts rejected because the ring buffer was full or a slot was stale.
    pub put_rejections: u64,
    /// Padding cycles run (sync warm-up plus async refills).
    pub padding_cycles: u64,
}

/// Atomic counters tracked across the lifetime of an id generator.
#[derive(Debug, Default)]
pub struct Metrics {
    mints: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    put_rejections: AtomicU64,
    padding_cycles: AtomicU64,
}

impl Metrics {
    /// Construct a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_mint(&self) {
        self.mints.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put_rejection(&self) {
        self.put_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_padding_cycle(&self) {
        self.padding_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters at once. Not atomic as a whole — individual fields
    /// may be read at slightly different instants under contention.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mints: self.mints.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            put_rejections: self.put_rejections.load(Ordering::Relaxed),
            padding_cycles: self.padding_cycles.load(Ordering::Relaxed),
        }
    }
}
