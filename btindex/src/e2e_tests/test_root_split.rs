//! Test the first root split.

use crate::e2e_tests::helpers::*;

#[test]
fn test_insert_1_to_25_splits_root_once() {
    let mut test = TestIndex::new();

    for key in 1..=19u64 {
        test.insert(key, key * 10).expect("insert");
    }
    let stats = test.verify().expect("verify");
    assert_eq!((stats.height, stats.node_count), (1, 1));

    // the 20th key overflows the root leaf
    test.insert(20, 200).expect("insert");
    let stats = test.verify().expect("verify");
    assert_eq!((stats.height, stats.node_count), (2, 3));

    for key in 21..=25u64 {
        test.insert(key, key * 10).expect("insert");
    }
    let stats = test.verify().expect("verify");
    assert_eq!(stats.height, 2);
    assert_eq!(stats.node_count, 3);
    assert_eq!(stats.entry_count, 25);

    assert_eq!(test.search(13).expect("search"), Some(130));
    assert_eq!(test.search(10).expect("search"), Some(100));
    assert_eq!(test.search(26).expect("search"), None);

    let expected: Vec<(u64, u64)> = (1..=25).map(|k| (k, k * 10)).collect();
    assert_eq!(traverse_all(&mut test), expected);
    assert_eq!(test.print_all().expect("print"), expected);
}
