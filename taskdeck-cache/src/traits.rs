//! Fetcher seam and cache statistics.

use async_trait::async_trait;
use taskdeck_core::RemoteError;

/// Source of authoritative values for a cache namespace.
///
/// The cache calls this at most once per key at a time; the implementation
/// does not need to deduplicate.
#[async_trait]
pub trait QueryFetcher<K, V>: Send + Sync {
    async fn fetch(&self, key: &K) -> Result<V, RemoteError>;
}

/// Counters describing cache traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served without starting a fetch.
    pub hits: u64,
    /// Reads that started a fetch.
    pub misses: u64,
    /// Fetches issued to the fetcher.
    pub fetches: u64,
    /// Requests that joined a fetch already in flight.
    pub joined: u64,
    /// Responses dropped because their fetch was cancelled or superseded.
    pub discarded: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
