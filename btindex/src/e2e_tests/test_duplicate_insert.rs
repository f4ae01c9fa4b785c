//! Test that duplicate keys never change stored values.

use crate::e2e_tests::helpers::*;

#[test]
fn test_duplicate_rejected_everywhere_in_tree() {
    let mut test = TestIndex::new();
    for key in shuffled_keys(11, 300) {
        test.insert(key, key + 1).expect("insert");
    }

    // hits keys in leaves and in internal nodes alike
    for key in shuffled_keys(12, 300) {
        let err = test.insert(key, 0).expect_err("duplicate must fail");
        assert!(err.is_duplicate_key(), "unexpected error: {err}");
        assert_eq!(test.search(key).expect("search"), Some(key + 1));
    }

    assert_eq!(test.len().expect("len"), 300);
    test.verify().expect("verify");
}
