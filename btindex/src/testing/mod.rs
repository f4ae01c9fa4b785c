use std::ops::{Deref, DerefMut};
use std::path::Path;

use tempfile::TempDir;

use crate::config::IndexConfig;
use crate::index::Index;

/// A fresh index in its own temporary directory.
///
/// The directory, and the index file in it, is removed on drop.
pub struct TestIndex {
    index: Index,
    dir: TempDir,
}

impl TestIndex {
    /// Create an empty index with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index with the given configuration.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("test.idx");
        let index = Index::create(&path, false, config).expect("create test index");
        Self { index, dir }
    }

    /// Scratch directory next to the index file.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Close the session and open the same file again.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn reopen(self) -> Self {
        let Self { index, dir } = self;
        let path = index.path().to_path_buf();
        let config = index.config();
        index.close().expect("close test index");
        let index = Index::open(&path, config).expect("reopen test index");
        Self { index, dir }
    }
}

impl Deref for TestIndex {
    type Target = Index;

    fn deref(&self) -> &Index {
        &self.index
    }
}

impl DerefMut for TestIndex {
    fn deref_mut(&mut self) -> &mut Index {
        &mut self.index
    }
}

impl Default for TestIndex {
    fn default() -> Self {
        Self::new()
    }
}
