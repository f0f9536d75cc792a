use crate::cache::config::CacheConfig;
use crate::cache::stats::CacheStats;
use crate::cache::LoadingCache;
use crate::error::Result;
use crate::source_of_record::StoreLoader;
use crate::store::{Batch, KeySet, KeyValueStore};
use parking_lot::RwLock;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};

type ReadCache<S> = LoadingCache<StoreLoader<S>>;

/// Wraps a [`KeyValueStore`] with a bounded read-through cache.
///
/// Reads are answered from the cache when possible and loaded from the backing store otherwise,
/// absent keys included. Single-key writes update or drop their own entry, every batched or
/// structural write (commit, batch put / delete, commit batch, drop) clears the whole cache
/// before reaching the store. Writes always go to the store synchronously, and a write the store
/// rejects drops whatever the cache may have picked up around it.
///
/// The cache exists only while the decorator is open: it is built when the backing store opens
/// and cleared and released when it closes. While closed, calls go straight to the store.
pub struct CachedReadsStore<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: CacheConfig,
    cache: RwLock<Option<ReadCache<S>>>,
}

impl<S: KeyValueStore> CachedReadsStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    pub fn with_config(store: S, config: CacheConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }
}

impl<S: KeyValueStore + ?Sized> CachedReadsStore<S> {
    /// Builds a decorator over a store the caller keeps a handle to. Writes that bypass the
    /// decorator are not seen by the cache.
    pub fn from_shared(store: Arc<S>, config: CacheConfig) -> Self {
        CachedReadsStore {
            store,
            config,
            cache: RwLock::new(None),
        }
    }

    pub fn backing_store(&self) -> &S {
        &self.store
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.config
    }

    /// Number of cached entries, `0` while closed.
    pub fn cache_size(&self) -> usize {
        self.with_cache(LoadingCache::size).unwrap_or(0)
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.with_cache(LoadingCache::stats).flatten()
    }

    fn with_cache<R>(&self, f: impl FnOnce(&ReadCache<S>) -> R) -> Option<R> {
        self.cache.read().as_ref().map(f)
    }

    fn invalidate_all(&self, reason: &'static str) {
        if self.with_cache(LoadingCache::invalidate_all).is_some() {
            debug!(store = %self.display_name(), reason, "invalidated cache");
        }
    }

    /// A failed write may have been applied partially, or raced with loads that cached the
    /// pre-write state, so the whole cache is dropped again before the error is returned.
    fn after_bulk_write(&self, reason: &'static str, written: Result<()>) -> Result<()> {
        if let Err(err) = &written {
            warn!(store = %self.display_name(), reason, error = %err, "store rejected write");
            self.invalidate_all(reason);
        }
        written
    }

    fn build_cache(&self) -> ReadCache<S> {
        LoadingCache::new(self.config, StoreLoader::new(Arc::clone(&self.store)))
    }

    fn display_name(&self) -> String {
        self.store.name().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// Clears and releases the cache when dropped, so `close` tears it down on every exit path,
/// unwinding included.
struct ReleaseCacheGuard<'a, S: KeyValueStore + ?Sized> {
    cache: &'a RwLock<Option<ReadCache<S>>>,
}

impl<S: KeyValueStore + ?Sized> Drop for ReleaseCacheGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.write().take() {
            cache.invalidate_all();
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for CachedReadsStore<S> {
    fn open(&self) -> Result<bool> {
        let mut cache = self.cache.write();

        if self.store.is_open() {
            if cache.is_none() {
                *cache = Some(self.build_cache());
            }
            return Ok(true);
        }

        let opened = self.store.open()?;
        if opened {
            *cache = Some(self.build_cache());
            info!(
                store = %self.display_name(),
                max_size = self.config.max_size,
                record_stats = self.config.record_stats,
                "opened with read cache"
            );
        } else {
            warn!(store = %self.display_name(), "backing store refused to open");
        }

        Ok(opened)
    }

    fn close(&self) -> Result<()> {
        let _release = ReleaseCacheGuard { cache: &self.cache };
        let closed = self.store.close();
        info!(store = %self.display_name(), ok = closed.is_ok(), "closed, cache released");
        closed
    }

    fn is_open(&self) -> bool {
        self.store.is_open()
    }

    fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    fn commit(&self) -> Result<bool> {
        self.invalidate_all("commit");
        self.store.commit()
    }

    fn compact(&self) -> Result<()> {
        self.store.compact()
    }

    /// Looks `key` up in the cache, loading from the backing store on a miss. If the load fails
    /// the failure is logged and the store is queried directly, without caching the answer.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cache = self.cache.read();
        let Some(cache) = cache.as_ref() else {
            return self.store.get(key);
        };

        match cache.get(key) {
            Ok(lookup) => {
                if tracing::enabled!(Level::DEBUG) {
                    if let Some(stats) = cache.stats() {
                        debug!(store = %self.display_name(), hit = lookup.is_hit(), %stats);
                    }
                }
                Ok(lookup.into_value())
            }
            Err(err) => {
                error!(store = %self.display_name(), error = %err, "cannot load from cache");
                self.store.get(key)
            }
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_cache(|cache| cache.put(key, value));

        let written = self.store.put(key, value);
        if let Err(err) = &written {
            warn!(store = %self.display_name(), error = %err, "store rejected put");
            self.with_cache(|cache| cache.invalidate(key));
        }
        written
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_cache(|cache| cache.invalidate(key));
        self.store.delete(key)
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        self.invalidate_all("put_batch");
        self.after_bulk_write("put_batch", self.store.put_batch(batch))
    }

    // Staged writes are invisible to the store until commit_batch, so the cache stays as is.
    fn put_to_batch(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store.put_to_batch(key, value)
    }

    fn commit_batch(&self) -> Result<()> {
        self.invalidate_all("commit_batch");
        self.after_bulk_write("commit_batch", self.store.commit_batch())
    }

    fn delete_batch(&self, keys: &[Vec<u8>]) -> Result<()> {
        self.invalidate_all("delete_batch");
        self.after_bulk_write("delete_batch", self.store.delete_batch(keys))
    }

    fn drop_all(&self) -> Result<()> {
        self.invalidate_all("drop");
        self.after_bulk_write("drop", self.store.drop_all())
    }

    fn keys(&self) -> Result<KeySet> {
        self.store.keys()
    }

    /// Absent markers in the cache say nothing about the store having data, only a cached
    /// present value short-circuits the store query.
    fn is_empty(&self) -> Result<bool> {
        if self
            .with_cache(LoadingCache::holds_present_value)
            .unwrap_or(false)
        {
            return Ok(false);
        }

        self.store.is_empty()
    }

    fn name(&self) -> Option<String> {
        self.store.name()
    }

    fn path(&self) -> Option<PathBuf> {
        self.store.path()
    }

    fn approximate_size(&self) -> i64 {
        self.store.approximate_size()
    }

    fn is_auto_commit_enabled(&self) -> bool {
        self.store.is_auto_commit_enabled()
    }

    fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    fn is_created_on_disk(&self) -> bool {
        self.store.is_created_on_disk()
    }

    fn is_locked(&self) -> bool {
        self.store.is_locked()
    }
}

impl<S> fmt::Display for CachedReadsStore<S>
where
    S: KeyValueStore + fmt::Display + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CachedReadsStore over {}", self.store)
    }
}

impl<S: KeyValueStore + ?Sized> fmt::Debug for CachedReadsStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedReadsStore")
            .field("store", &self.display_name())
            .field("config", &self.config)
            .field("cache_size", &self.cache_size())
            .finish()
    }
}
