use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("failed to decode record at {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("backend error: {0}")]
    Backend(String),

    /// The cache could not populate an entry from its source of record.
    #[error("cache load failed: {source}")]
    LoadFailed {
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn load_failed(source: StoreError) -> Self {
        StoreError::LoadFailed {
            source: Box::new(source),
        }
    }
}
