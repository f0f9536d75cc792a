use cached_reads::store::Batch;
use cached_reads::{CacheConfig, CachedReadsStore, KeyValueStore, MemoryStore};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Get(u8),
    Put(u8, u8),
    Delete(u8),
    PutBatch(Vec<(u8, u8)>),
    PutToBatch(u8, u8),
    CommitBatch,
    DeleteBatch(Vec<u8>),
    Commit,
    Drop,
    Reopen,
}

fn op() -> impl Strategy<Value = Op> {
    let key = 0u8..12;
    prop_oneof![
        4 => key.clone().prop_map(Op::Get),
        3 => (key.clone(), any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key.clone().prop_map(Op::Delete),
        1 => prop::collection::vec((key.clone(), any::<u8>()), 0..4).prop_map(Op::PutBatch),
        1 => (key.clone(), any::<u8>()).prop_map(|(k, v)| Op::PutToBatch(k, v)),
        1 => Just(Op::CommitBatch),
        1 => prop::collection::vec(key, 0..4).prop_map(Op::DeleteBatch),
        1 => Just(Op::Commit),
        1 => Just(Op::Drop),
        1 => Just(Op::Reopen),
    ]
}

fn apply(db: &dyn KeyValueStore, op: &Op) -> Option<Option<Vec<u8>>> {
    match op {
        Op::Get(k) => return Some(db.get(&[*k]).unwrap()),
        Op::Put(k, v) => db.put(&[*k], &[*v]).unwrap(),
        Op::Delete(k) => db.delete(&[*k]).unwrap(),
        Op::PutBatch(entries) => {
            let batch: Batch = entries.iter().map(|(k, v)| (vec![*k], vec![*v])).collect();
            db.put_batch(&batch).unwrap();
        }
        Op::PutToBatch(k, v) => db.put_to_batch(&[*k], &[*v]).unwrap(),
        Op::CommitBatch => db.commit_batch().unwrap(),
        Op::DeleteBatch(keys) => {
            let keys: Vec<Vec<u8>> = keys.iter().map(|k| vec![*k]).collect();
            db.delete_batch(&keys).unwrap();
        }
        Op::Commit => {
            db.commit().unwrap();
        }
        Op::Drop => db.drop_all().unwrap(),
        Op::Reopen => {
            db.close().unwrap();
            assert!(db.open().unwrap());
        }
    }
    None
}

proptest! {
    /// Through any sequence of operations the decorator answers exactly like the bare store.
    #[test]
    fn decorator_reads_match_bare_store(
        ops in prop::collection::vec(op(), 1..64),
        max_size in prop_oneof![Just(0u64), 1u64..8],
    ) {
        let plain = MemoryStore::new();
        let config = CacheConfig::new(max_size, true);
        let cached = CachedReadsStore::with_config(MemoryStore::new(), config);
        prop_assert!(plain.open().unwrap());
        prop_assert!(cached.open().unwrap());

        for op in &ops {
            let expected = apply(&plain, op);
            let actual = apply(&cached, op);
            prop_assert_eq!(actual, expected, "diverged on {:?}", op);
            prop_assert_eq!(cached.is_empty().unwrap(), plain.is_empty().unwrap());
        }

        if max_size > 0 {
            prop_assert!(cached.cache_size() as u64 <= max_size);
        }
    }
}
