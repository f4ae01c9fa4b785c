//! Test loading a file that repeats a key.

use crate::e2e_tests::helpers::*;

#[test]
fn test_load_same_pair_twice() {
    let mut test = TestIndex::new();
    let input = write_file(test.dir(), "pairs.txt", "5,50\n5,50\n");

    let report = test.load(&input).expect("load");
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, vec![5]);
    assert!(report.malformed_lines.is_empty());

    assert_eq!(traverse_all(&mut test), vec![(5, 50)]);
}

#[test]
fn test_load_skips_malformed_lines() {
    let mut test = TestIndex::new();
    let input = write_file(
        test.dir(),
        "pairs.txt",
        "1,10\n\n  2 , 20 \nthree,30\n4\n5,50\n",
    );

    let report = test.load(&input).expect("load");
    assert_eq!(report.inserted, 3);
    assert_eq!(report.malformed_lines, vec![4, 5]);
    assert_eq!(traverse_all(&mut test), vec![(1, 10), (2, 20), (5, 50)]);
}

#[test]
fn test_load_skips_line_with_invalid_utf8() {
    let mut test = TestIndex::new();
    let input = test.dir().join("binary.txt");
    std::fs::write(&input, b"1,10\n\xff\xfe,20\n3,30\n").expect("write input file");

    let report = test.load(&input).expect("load");
    assert_eq!(report.inserted, 2);
    assert_eq!(report.malformed_lines, vec![2]);
    assert_eq!(test.print_all().expect("print"), vec![(1, 10), (3, 30)]);
}
