use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub load_success_count: u64,
    pub load_failure_count: u64,
    pub total_load_time: Duration,
    pub eviction_count: u64,
}

impl CacheStats {
    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Ratio of requests answered from the cache, `1.0` when nothing was requested yet.
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 1.0,
            requests => self.hit_count as f64 / requests as f64,
        }
    }

    pub fn miss_rate(&self) -> f64 {
        match self.request_count() {
            0 => 0.0,
            requests => self.miss_count as f64 / requests as f64,
        }
    }

    pub fn load_count(&self) -> u64 {
        self.load_success_count + self.load_failure_count
    }

    pub fn average_load_penalty(&self) -> Duration {
        match u32::try_from(self.load_count()) {
            Ok(0) => Duration::ZERO,
            Ok(loads) => self.total_load_time / loads,
            Err(_) => Duration::from_secs_f64(
                self.total_load_time.as_secs_f64() / self.load_count() as f64,
            ),
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats{{hitCount={}, missCount={}, loadSuccessCount={}, loadFailureCount={}, \
             totalLoadTime={:?}, evictionCount={}}}",
            self.hit_count,
            self.miss_count,
            self.load_success_count,
            self.load_failure_count,
            self.total_load_time,
            self.eviction_count
        )
    }
}

/// Lock-free counters shared by all segments.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    total_load_nanos: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_success(&self, elapsed: Duration) {
        self.load_successes.fetch_add(1, Ordering::Relaxed);
        self.add_load_time(elapsed);
    }

    pub(crate) fn record_load_failure(&self, elapsed: Duration) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        self.add_load_time(elapsed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn add_load_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_load_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            load_success_count: self.load_successes.load(Ordering::Relaxed),
            load_failure_count: self.load_failures.load(Ordering::Relaxed),
            total_load_time: Duration::from_nanos(self.total_load_nanos.load(Ordering::Relaxed)),
            eviction_count: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_with_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.average_load_penalty(), Duration::ZERO);
    }

    #[test]
    fn counters_feed_snapshot() {
        let counter = StatsCounter::default();
        counter.record_hit();
        counter.record_hit();
        counter.record_hit();
        counter.record_miss();
        counter.record_load_success(Duration::from_millis(4));
        counter.record_load_failure(Duration::from_millis(2));

        let stats = counter.snapshot();
        assert_eq!(stats.request_count(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.load_count(), 2);
        assert_eq!(stats.average_load_penalty(), Duration::from_millis(3));
    }
}
