//! Test randomized insertion orders against the tree invariants.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::IndexConfig;
use crate::e2e_tests::helpers::*;

#[test]
fn test_invariants_hold_after_every_insert() {
    let mut test = TestIndex::with_config(IndexConfig {
        cache_capacity: 16,
        sync_writes: false,
    });
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut expected = BTreeMap::new();

    for _ in 0..600 {
        let key = rng.random_range(0..2_000u64);
        let value = rng.random::<u64>();
        match test.insert(key, value) {
            Ok(()) => {
                assert!(expected.insert(key, value).is_none());
            }
            Err(e) => {
                assert!(e.is_duplicate_key(), "unexpected error: {e}");
                assert!(expected.contains_key(&key));
            }
        }
        let stats = test.verify().expect("verify");
        assert_eq!(stats.entry_count, expected.len());
    }

    for (&key, &value) in &expected {
        assert_eq!(test.search(key).expect("search"), Some(value));
    }
    let entries = traverse_all(&mut test);
    assert_eq!(entries, expected.into_iter().collect::<Vec<_>>());
}

#[test]
fn test_many_orders_same_contents() {
    let mut reference = None;
    for seed in 0..4 {
        let mut test = TestIndex::with_config(IndexConfig {
            cache_capacity: 0,
            sync_writes: false,
        });
        for key in shuffled_keys(seed, 1_000) {
            test.insert(key, key / 7).expect("insert");
        }
        let stats = test.verify().expect("verify");
        assert_eq!(stats.entry_count, 1_000);

        let entries = traverse_all(&mut test);
        assert_strictly_ascending(&entries);
        match &reference {
            None => reference = Some(entries),
            Some(reference) => assert_eq!(&entries, reference),
        }
    }
}
