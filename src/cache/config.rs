use serde::Deserialize;

pub const DEFAULT_MAX_SIZE: u64 = 1024;

/// Construction parameters of a [`LoadingCache`](super::LoadingCache). Fixed for the lifetime of
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of entries, `0` for unbounded.
    pub max_size: u64,
    /// Whether hit/miss/load counters are maintained.
    pub record_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            record_stats: true,
        }
    }
}

impl CacheConfig {
    pub fn new(max_size: u64, record_stats: bool) -> Self {
        Self {
            max_size,
            record_stats,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0, true)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        assert_eq!(CacheConfig::from_json("{}").unwrap(), CacheConfig::default());
        assert_eq!(
            CacheConfig::from_json(r#"{"max_size": 0}"#).unwrap(),
            CacheConfig::unbounded()
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(CacheConfig::from_json(r#"{"max_entries": 10}"#).is_err());
    }
}
