//! Read-through caching for byte-keyed key-value stores.
//!
//! [`CachedReadsStore`] decorates any [`KeyValueStore`] with a bounded, segmented, in-memory
//! cache. Reads are served from the cache and loaded on a miss, writes always reach the backing
//! store, and every mutation path keeps the cache from diverging from it.
//!
//! ```
//! use cached_reads::{CachedReadsStore, KeyValueStore, MemoryStore};
//!
//! let db = CachedReadsStore::new(MemoryStore::named("blocks"));
//! assert!(db.open()?);
//!
//! db.put(b"a", b"1")?;
//! assert_eq!(db.get(b"a")?, Some(b"1".to_vec()));
//! assert_eq!(db.cache_size(), 1);
//!
//! db.delete_batch(&[b"a".to_vec()])?;
//! assert_eq!(db.cache_size(), 0);
//! assert_eq!(db.get(b"a")?, None);
//! # Ok::<(), cached_reads::StoreError>(())
//! ```

pub mod cache;
pub mod cached_reads;
pub mod error;
pub mod key;
pub mod source_of_record;
pub mod store;

pub use cache::config::CacheConfig;
pub use cache::stats::CacheStats;
pub use cache::{CacheLookup, LoadingCache};
pub use cached_reads::CachedReadsStore;
pub use error::{Result, StoreError};
pub use key::ByteArrayKey;
pub use source_of_record::{SourceOfRecord, StoreLoader};
pub use store::discrete_files::{DiscreteFileStoreBincode, DiscreteFileStoreJson};
pub use store::memory::MemoryStore;
pub use store::KeyValueStore;
