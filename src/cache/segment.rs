use crate::key::ByteArrayKey;
use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub(crate) type CachedValue = Option<Vec<u8>>;

/// What a finished load hands to the threads that waited on it. Store errors are not `Clone`,
/// so waiters only get the rendered reason.
pub(crate) type LoadOutcome = std::result::Result<CachedValue, String>;

/// Outcome of offering an entry to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Inserted { evicted: bool },
    /// A concurrent write or invalidation got there first, the offered value may be stale.
    Rejected,
}

/// Result of looking a key up before loading it.
pub(crate) enum Lookup {
    Hit(CachedValue),
    /// No entry and no load in flight: the caller loads and must `finish_load`.
    Lead { generation: u64, flight: Arc<InFlight> },
    /// Another thread is already loading this key.
    Wait(Arc<InFlight>),
}

/// A load in progress, shared by every thread that missed on the same key meanwhile.
#[derive(Default)]
pub(crate) struct InFlight {
    outcome: Mutex<Option<LoadOutcome>>,
    ready: Condvar,
}

impl InFlight {
    pub(crate) fn complete(&self, outcome: LoadOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.ready.notify_all();
    }

    pub(crate) fn wait(&self) -> LoadOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

/// One independently locked slice of the cache, tracking recency with an LRU list.
///
/// Reads through `lookup` refresh the usage order. Inspection helpers such as
/// `holds_present_value` walk the entries without touching it.
pub(crate) struct Segment {
    entries: LruCache<ByteArrayKey, CachedValue>,
    loading: HashMap<ByteArrayKey, Arc<InFlight>>,
    /// Bumped whenever an entry is removed without replacement, so loads that started before
    /// the invalidation can tell their result is outdated.
    generation: u64,
}

impl Segment {
    pub(crate) fn new(max_capacity: Option<NonZeroUsize>) -> Self {
        let entries = match max_capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Segment {
            entries,
            loading: HashMap::new(),
            generation: 0,
        }
    }

    pub(crate) fn lookup(&mut self, key: &[u8]) -> Lookup {
        if let Some(value) = self.entries.get(key) {
            return Lookup::Hit(value.clone());
        }
        if let Some(flight) = self.loading.get(key) {
            return Lookup::Wait(Arc::clone(flight));
        }

        let flight = Arc::new(InFlight::default());
        self.loading.insert(ByteArrayKey::wrap(key), Arc::clone(&flight));
        Lookup::Lead {
            generation: self.generation,
            flight,
        }
    }

    /// Retires `flight` and, on success, offers its value as a freshly loaded entry. A flight
    /// already detached by an invalidation is left alone.
    pub(crate) fn finish_load(
        &mut self,
        key: &[u8],
        flight: &Arc<InFlight>,
        loaded: Option<(CachedValue, u64)>,
    ) -> Admission {
        if self
            .loading
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            self.loading.remove(key);
        }

        match loaded {
            Some((value, generation)) => {
                self.insert_loaded(ByteArrayKey::wrap(key), value, generation)
            }
            None => Admission::Rejected,
        }
    }

    pub(crate) fn insert(&mut self, key: ByteArrayKey, value: CachedValue) -> Admission {
        let incoming = key.clone();
        let evicted = matches!(
            self.entries.push(key, value),
            Some((displaced, _)) if displaced != incoming
        );

        Admission::Inserted { evicted }
    }

    /// Inserts a freshly loaded value unless the segment changed since `generation` was read or
    /// the key was written in the meantime.
    fn insert_loaded(
        &mut self,
        key: ByteArrayKey,
        value: CachedValue,
        generation: u64,
    ) -> Admission {
        if generation != self.generation || self.entries.contains(key.data()) {
            return Admission::Rejected;
        }

        self.insert(key, value)
    }

    /// Drops the entry and detaches any load in flight for it, so later readers start a fresh
    /// load instead of joining one that may return the old value.
    pub(crate) fn invalidate(&mut self, key: &[u8]) {
        self.generation += 1;
        self.entries.pop(key);
        self.loading.remove(key);
    }

    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.entries.clear();
        self.loading.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn holds_present_value(&self) -> bool {
        self.entries.iter().any(|(_, value)| value.is_some())
    }
}
