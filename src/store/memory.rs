use crate::error::{Result, StoreError};
use crate::store::{Batch, KeySet, KeyValueStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Default)]
struct MemoryState {
    open: bool,
    data: HashMap<Vec<u8>, Vec<u8>>,
    pending: Vec<(Vec<u8>, Vec<u8>)>,
}

impl MemoryState {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

/// Volatile store. Contents survive `close` / `open` cycles of the same instance, but not the
/// process.
#[derive(Default)]
pub struct MemoryStore {
    name: Option<String>,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        MemoryStore {
            name: Some(name.into()),
            state: RwLock::default(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn open(&self) -> Result<bool> {
        self.state.write().open = true;
        Ok(true)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        state.open = false;
        state.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.read().open
    }

    fn commit(&self) -> Result<bool> {
        Ok(self.state.read().open)
    }

    fn compact(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.data.shrink_to_fit();
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.data.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.data.remove(key);
        Ok(())
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state
            .data
            .extend(batch.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    fn put_to_batch(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.pending.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn commit_batch(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        let pending = std::mem::take(&mut state.pending);
        state.data.extend(pending);
        Ok(())
    }

    fn delete_batch(&self, keys: &[Vec<u8>]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        for key in keys {
            state.data.remove(key);
        }
        Ok(())
    }

    fn drop_all(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.data.clear();
        state.pending.clear();
        Ok(())
    }

    fn keys(&self) -> Result<KeySet> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.data.keys().cloned().collect())
    }

    fn is_empty(&self) -> Result<bool> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.data.is_empty())
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn path(&self) -> Option<PathBuf> {
        None
    }

    fn approximate_size(&self) -> i64 {
        i64::try_from(self.state.read().data.len()).unwrap_or(i64::MAX)
    }

    fn is_auto_commit_enabled(&self) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_created_on_disk(&self) -> bool {
        false
    }

    fn is_locked(&self) -> bool {
        self.state.is_locked()
    }
}

impl fmt::Display for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore:{}", self.name.as_deref().unwrap_or("<unnamed>"))
    }
}
