#![allow(dead_code)]

use cached_reads::store::{Batch, KeySet};
use cached_reads::{KeyValueStore, MemoryStore, Result, StoreError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Memory store that counts reads and can be told to misbehave.
#[derive(Default)]
pub struct InstrumentedStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    fail_next_get: AtomicBool,
    fail_next_put: AtomicBool,
    fail_next_batch: AtomicBool,
    fail_close: AtomicBool,
    panic_on_close: AtomicBool,
    refuse_open: AtomicBool,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        InstrumentedStore {
            inner: MemoryStore::named("instrumented"),
            ..Default::default()
        }
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn fail_next_get(&self) {
        self.fail_next_get.store(true, Ordering::SeqCst);
    }

    /// The next `put` is rejected without touching the data.
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// The next batch write lands but reports failure, like a write whose acknowledgement was
    /// lost.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    fn batch_outcome(&self) -> Result<()> {
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("batch not acknowledged".into()));
        }
        Ok(())
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn panic_on_close(&self) {
        self.panic_on_close.store(true, Ordering::SeqCst);
    }

    pub fn refuse_open(&self) {
        self.refuse_open.store(true, Ordering::SeqCst);
    }

    /// Writes straight into the backing data, bypassing any decorator.
    pub fn put_behind_the_cache(&self, key: &[u8], value: &[u8]) {
        self.inner.put(key, value).unwrap();
    }
}

impl KeyValueStore for InstrumentedStore {
    fn open(&self) -> Result<bool> {
        if self.refuse_open.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.open()
    }

    fn close(&self) -> Result<()> {
        if self.panic_on_close.load(Ordering::SeqCst) {
            panic!("close exploded");
        }
        self.inner.close()?;
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("close failed".into()));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn commit(&self) -> Result<bool> {
        self.inner.commit()
    }

    fn compact(&self) -> Result<()> {
        self.inner.compact()
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_get.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("transient read failure".into()));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.delete(key)
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        self.inner.put_batch(batch)?;
        self.batch_outcome()
    }

    fn put_to_batch(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.put_to_batch(key, value)
    }

    fn commit_batch(&self) -> Result<()> {
        self.inner.commit_batch()?;
        self.batch_outcome()
    }

    fn delete_batch(&self, keys: &[Vec<u8>]) -> Result<()> {
        self.inner.delete_batch(keys)?;
        self.batch_outcome()
    }

    fn drop_all(&self) -> Result<()> {
        self.inner.drop_all()?;
        self.batch_outcome()
    }

    fn keys(&self) -> Result<KeySet> {
        self.inner.keys()
    }

    fn is_empty(&self) -> Result<bool> {
        self.inner.is_empty()
    }

    fn name(&self) -> Option<String> {
        self.inner.name()
    }

    fn path(&self) -> Option<PathBuf> {
        self.inner.path()
    }

    fn approximate_size(&self) -> i64 {
        self.inner.approximate_size()
    }

    fn is_auto_commit_enabled(&self) -> bool {
        self.inner.is_auto_commit_enabled()
    }

    fn is_persistent(&self) -> bool {
        self.inner.is_persistent()
    }

    fn is_created_on_disk(&self) -> bool {
        self.inner.is_created_on_disk()
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
