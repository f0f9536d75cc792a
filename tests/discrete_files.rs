mod common;

use cached_reads::{CachedReadsStore, DiscreteFileStoreBincode, KeyValueStore};
use common::init_tracing;
use tempfile::TempDir;

#[test]
fn cached_reads_over_files_survive_restart() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("state");

    {
        let db = CachedReadsStore::new(DiscreteFileStoreBincode::new(&records));
        assert!(db.open().unwrap());
        db.put(b"block-1", b"genesis").unwrap();
        db.put(b"block-2", b"child").unwrap();
        assert!(db.commit().unwrap());
        db.close().unwrap();
    }

    let db = CachedReadsStore::new(DiscreteFileStoreBincode::new(&records));
    assert!(db.open().unwrap());
    assert!(db.is_persistent());
    assert!(db.is_created_on_disk());
    assert_eq!(db.path(), Some(records.clone()));
    assert_eq!(db.name(), Some("state".to_string()));

    assert_eq!(db.get(b"block-1").unwrap(), Some(b"genesis".to_vec()));
    assert_eq!(db.get(b"block-1").unwrap(), Some(b"genesis".to_vec()));
    assert_eq!(db.cache_stats().unwrap().hit_count, 1);
    assert_eq!(db.approximate_size(), 2);

    db.drop_all().unwrap();
    assert_eq!(db.cache_size(), 0);
    assert!(db.is_empty().unwrap());
    assert_eq!(db.get(b"block-2").unwrap(), None);
}
