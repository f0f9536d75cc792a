pub mod config;
pub(crate) mod segment;
pub mod stats;

use crate::cache::config::CacheConfig;
use crate::cache::segment::{
    Admission, CachedValue, InFlight, LoadOutcome, Lookup, Segment,
};
use crate::cache::stats::{CacheStats, StatsCounter};
use crate::error::{Result, StoreError};
use crate::key::ByteArrayKey;
use crate::source_of_record::SourceOfRecord;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::BuildHasher;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

const MAX_SEGMENTS: usize = 16;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CacheLookup<Value> {
    /// Value was not cached and had to be fetched from the source of record.
    Miss(Value),

    /// Value was served from the cache.
    Hit(Value),
}

impl<Value> CacheLookup<Value> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            CacheLookup::Miss(value) | CacheLookup::Hit(value) => value,
        }
    }
}

/// Bounded read-through cache of byte entries, including "confirmed absent" answers.
///
/// Keys are spread over up to 16 segments, each behind its own lock, so operations on unrelated
/// keys rarely contend. The size bound is split across segments and enforced per segment with
/// least-recently-used eviction. Loads run outside the segment lock and concurrent misses on one
/// key share a single load. A loaded value is only admitted if nothing invalidated or wrote that
/// segment while the load was in flight.
pub struct LoadingCache<L: SourceOfRecord> {
    segments: Box<[Mutex<Segment>]>,
    hasher: RandomState,
    loader: L,
    config: CacheConfig,
    stats: Option<StatsCounter>,
}

impl<L: SourceOfRecord> LoadingCache<L> {
    pub fn new(config: CacheConfig, loader: L) -> Self {
        let segments = segment_capacities(config.max_size)
            .into_iter()
            .map(|capacity| Mutex::new(Segment::new(capacity)))
            .collect();

        Self {
            segments,
            hasher: RandomState::new(),
            loader,
            config,
            stats: config.record_stats.then(StatsCounter::default),
        }
    }

    fn segment_for(&self, key: &[u8]) -> &Mutex<Segment> {
        let hash = self.hasher.hash_one(key);
        &self.segments[(hash % self.segments.len() as u64) as usize]
    }

    /// Returns the cached answer for `key`, loading and caching it on a miss.
    ///
    /// Threads that miss on a key while it is being loaded wait for that load instead of starting
    /// their own. A failing load is reported as [`StoreError::LoadFailed`] to every one of them and
    /// leaves the cache untouched.
    pub fn get(&self, key: &[u8]) -> Result<CacheLookup<Option<Vec<u8>>>> {
        let segment = self.segment_for(key);

        let lookup = segment.lock().lookup(key);
        let (generation, flight) = match lookup {
            Lookup::Hit(value) => {
                self.record(StatsCounter::record_hit);
                return Ok(CacheLookup::Hit(value));
            }
            Lookup::Wait(flight) => {
                self.record(StatsCounter::record_miss);
                return match flight.wait() {
                    Ok(value) => Ok(CacheLookup::Miss(value)),
                    Err(reason) => Err(StoreError::load_failed(StoreError::Backend(reason))),
                };
            }
            Lookup::Lead { generation, flight } => (generation, flight),
        };
        self.record(StatsCounter::record_miss);

        let pending = PendingLoad {
            segment,
            key,
            flight,
            finished: false,
        };

        let started = Instant::now();
        let loaded = self.loader.retrieve(key);
        let elapsed = started.elapsed();

        match loaded {
            Ok(value) => {
                if let Some(stats) = &self.stats {
                    stats.record_load_success(elapsed);
                }

                let admission =
                    pending.finish(Some((value.clone(), generation)), Ok(value.clone()));
                match admission {
                    Admission::Inserted { evicted } => {
                        if evicted {
                            self.record(StatsCounter::record_eviction);
                        }
                    }
                    Admission::Rejected => trace!(
                        key_len = key.len(),
                        "segment changed during load, result not cached"
                    ),
                }

                Ok(CacheLookup::Miss(value))
            }
            Err(err) => {
                if let Some(stats) = &self.stats {
                    stats.record_load_failure(elapsed);
                }
                pending.finish(None, Err(err.to_string()));
                Err(StoreError::load_failed(err))
            }
        }
    }

    /// Caches `value` as the present value of `key`, replacing whatever was there.
    pub fn put(&self, key: &[u8], value: &[u8]) {
        let admission = self
            .segment_for(key)
            .lock()
            .insert(ByteArrayKey::wrap(key), Some(value.to_vec()));

        if admission == (Admission::Inserted { evicted: true }) {
            self.record(StatsCounter::record_eviction);
        }
    }

    pub fn invalidate(&self, key: &[u8]) {
        self.segment_for(key).lock().invalidate(key);
    }

    pub fn invalidate_all(&self) {
        for segment in self.segments.iter() {
            segment.lock().clear();
        }
    }

    /// Number of cached entries, confirmed-absent markers included.
    pub fn size(&self) -> usize {
        self.segments.iter().map(|segment| segment.lock().len()).sum()
    }

    /// Whether at least one cached entry is a present value, as opposed to an absent marker.
    pub fn holds_present_value(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| segment.lock().holds_present_value())
    }

    /// Counter snapshot, `None` when the cache was built without stats.
    pub fn stats(&self) -> Option<CacheStats> {
        self.stats.as_ref().map(StatsCounter::snapshot)
    }

    fn record(&self, event: fn(&StatsCounter)) {
        if let Some(stats) = &self.stats {
            event(stats);
        }
    }
}

impl<L: SourceOfRecord> fmt::Debug for LoadingCache<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LoadingCache<max: {}, segments: {}, stats: {}>",
            self.config.max_size,
            self.segments.len(),
            self.config.record_stats
        )
    }
}

/// A load this thread leads. Waiters are released when it finishes, and also if the loader
/// unwinds before that.
struct PendingLoad<'a> {
    segment: &'a Mutex<Segment>,
    key: &'a [u8],
    flight: Arc<InFlight>,
    finished: bool,
}

impl PendingLoad<'_> {
    fn finish(mut self, loaded: Option<(CachedValue, u64)>, outcome: LoadOutcome) -> Admission {
        self.finished = true;
        let admission = self
            .segment
            .lock()
            .finish_load(self.key, &self.flight, loaded);
        self.flight.complete(outcome);
        admission
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.segment.lock().finish_load(self.key, &self.flight, None);
            self.flight.complete(Err("load abandoned".to_string()));
        }
    }
}

/// Splits `max_size` over the segments so the per-segment bounds add up exactly to it.
fn segment_capacities(max_size: u64) -> Vec<Option<NonZeroUsize>> {
    if max_size == 0 {
        return vec![None; MAX_SEGMENTS];
    }

    let max_size = usize::try_from(max_size).unwrap_or(usize::MAX);
    let count = max_size.min(MAX_SEGMENTS);
    let base = max_size / count;
    let remainder = max_size % count;

    (0..count)
        .map(|index| NonZeroUsize::new(if index < remainder { base + 1 } else { base }))
        .collect()
}
