pub mod discrete_files;
pub mod memory;

use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

pub type KeySet = HashSet<Vec<u8>>;
pub type Batch = HashMap<Vec<u8>, Vec<u8>>;

/// A byte-keyed, byte-valued database. Implementations synchronize internally; every method
/// takes `&self` so one instance can be shared across threads.
pub trait KeyValueStore: Send + Sync {
    /// Opens the store. Returns `Ok(false)` when the store could not be opened but no error
    /// occurred (e.g. it is locked by another owner).
    fn open(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;

    fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Makes pending writes durable. Stores with auto-commit enabled can treat this as a no-op.
    fn commit(&self) -> Result<bool>;

    fn compact(&self) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    fn put_batch(&self, batch: &Batch) -> Result<()>;

    /// Stages a write in the pending batch. It is not visible to `get` until `commit_batch`.
    fn put_to_batch(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn commit_batch(&self) -> Result<()>;

    fn delete_batch(&self, keys: &[Vec<u8>]) -> Result<()>;

    /// Removes every entry from the store.
    fn drop_all(&self) -> Result<()>;

    fn keys(&self) -> Result<KeySet>;

    fn is_empty(&self) -> Result<bool>;

    fn name(&self) -> Option<String>;

    fn path(&self) -> Option<PathBuf>;

    /// Rough entry count, `-1` when the store cannot tell.
    fn approximate_size(&self) -> i64;

    fn is_auto_commit_enabled(&self) -> bool;

    fn is_persistent(&self) -> bool;

    fn is_created_on_disk(&self) -> bool;

    fn is_locked(&self) -> bool;
}
