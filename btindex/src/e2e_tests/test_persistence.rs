//! Test that the index survives closing and reopening.

use crate::e2e_tests::helpers::*;

#[test]
fn test_reopen_reproduces_contents() {
    let mut test = TestIndex::new();
    let keys = shuffled_keys(42, 800);
    for &key in &keys {
        test.insert(key, key * 2).expect("insert");
    }
    let before = traverse_all(&mut test);
    let stats_before = test.verify().expect("verify");

    let mut test = test.reopen();
    assert_eq!(traverse_all(&mut test), before);
    assert_eq!(test.verify().expect("verify"), stats_before);
    for &key in &keys {
        assert_eq!(test.search(key).expect("search"), Some(key * 2));
    }

    // keep growing after reopen
    for key in 1..=100u64 {
        test.insert(key * 7 + 1, key).expect("insert");
    }
    let mut test = test.reopen();
    assert_eq!(test.len().expect("len"), 900);
    test.verify().expect("verify");
}

#[test]
fn test_reopen_empty_index() {
    let mut test = TestIndex::new().reopen();
    assert!(test.is_empty());
    assert!(traverse_all(&mut test).is_empty());
    assert_eq!(test.search(1).expect("search"), None);
}
