//! Test opening files that are not index files.

use crate::config::IndexConfig;
use crate::e2e_tests::helpers::*;
use crate::index::{Index, IndexError};
use crate::storage::{CodecError, StoreError};

#[test]
fn test_open_wrong_magic_fails_without_mutation() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("bad.idx");
    Index::create(&path, false, IndexConfig::default())
        .expect("create")
        .close()
        .expect("close");

    let mut bytes = std::fs::read(&path).expect("read index");
    bytes[..8].copy_from_slice(b"4337PRJ2");
    std::fs::write(&path, &bytes).expect("write index");

    let result = Index::open(&path, IndexConfig::default());
    assert!(matches!(
        result,
        Err(IndexError::Store(StoreError::Format(CodecError::InvalidMagic(_))))
    ));
    assert_eq!(std::fs::read(&path).expect("read index"), bytes);
}

#[test]
fn test_open_truncated_file() {
    let test = TestIndex::new();
    let path = write_file(test.dir(), "short.idx", "4337PRJ3");

    let result = Index::open(&path, IndexConfig::default());
    assert!(matches!(
        result,
        Err(IndexError::Store(StoreError::Format(CodecError::InvalidLength(8))))
    ));
}
