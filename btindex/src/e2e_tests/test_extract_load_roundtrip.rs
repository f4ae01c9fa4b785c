//! Test that extract followed by load reproduces the index.

use crate::e2e_tests::helpers::*;

#[test]
fn test_extract_then_load_into_fresh_index() {
    let mut source = TestIndex::new();
    for key in shuffled_keys(3, 500) {
        source.insert(key, key.wrapping_mul(31)).expect("insert");
    }

    let dump = source.dir().join("dump.txt");
    assert_eq!(source.extract(&dump, false).expect("extract"), 500);

    let mut copy = TestIndex::new();
    let report = copy.load(&dump).expect("load");
    assert_eq!(report.inserted, 500);
    assert!(report.skipped_duplicates.is_empty());

    let original = traverse_all(&mut source);
    assert_strictly_ascending(&original);
    assert_eq!(traverse_all(&mut copy), original);
    copy.verify().expect("verify copy");
}
