//! Cache statistics and metrics tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for cache activity, updated with relaxed atomics.
#[derive(Debug)]
pub struct CacheStats {
    /// Stored response served
    pub hits: AtomicU64,
    /// Lookup found nothing usable
    pub misses: AtomicU64,
    /// Stored response found but older than `max-age`
    pub stale: AtomicU64,
    /// Entries committed
    pub writes: AtomicU64,
    /// Edits aborted after a write failure
    pub write_aborts: AtomicU64,
    /// Writes refused before an edit was opened
    pub write_skips: AtomicU64,
    /// Stored metadata that failed to decode
    pub decode_errors: AtomicU64,
    /// Requests delegated to the transport
    pub network_fetches: AtomicU64,
    /// Cache creation time
    pub created_at: Instant,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub writes: u64,
    pub write_aborts: u64,
    pub write_skips: u64,
    pub decode_errors: u64,
    pub network_fetches: u64,
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            write_aborts: AtomicU64::new(0),
            write_skips: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            network_fetches: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_abort(&self) {
        self.write_aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_skip(&self) {
        self.write_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get hit ratio
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else if hits > (1u64 << 53) || total > (1u64 << 53) {
            let hit_rate_scaled = (u128::from(hits) * 1_000_000_000) / u128::from(total);
            (hit_rate_scaled as f64) / 1_000_000_000.0
        } else {
            (hits as f64) / (total as f64)
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_aborts: self.write_aborts.load(Ordering::Relaxed),
            write_skips: self.write_skips.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
        }
    }

    /// Get cache age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_ratio(), 0.0);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_copies_counters() {
        let stats = CacheStats::default();
        stats.record_write();
        stats.record_write_skip();
        stats.record_network_fetch();
        stats.record_network_fetch();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.write_skips, 1);
        assert_eq!(snapshot.network_fetches, 2);
        assert_eq!(snapshot.hits, 0);
    }
}
