use crate::error::Result;
use crate::store::KeyValueStore;
use std::sync::Arc;

/// Where a [`LoadingCache`](crate::cache::LoadingCache) fetches entries it does not hold.
///
/// `Ok(None)` is an answer, not a failure: it is cached as "confirmed absent".
pub trait SourceOfRecord: Send + Sync {
    fn retrieve(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

impl<F> SourceOfRecord for F
where
    F: Fn(&[u8]) -> Result<Option<Vec<u8>>> + Send + Sync,
{
    fn retrieve(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self(key)
    }
}

/// Loads through a shared backing store's own `get`.
pub struct StoreLoader<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> StoreLoader<S> {
    pub fn new(store: Arc<S>) -> Self {
        StoreLoader { store }
    }
}

impl<S> SourceOfRecord for StoreLoader<S>
where
    S: KeyValueStore + ?Sized,
{
    fn retrieve(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(key)
    }
}
