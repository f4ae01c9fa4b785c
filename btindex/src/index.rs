//! Index session.
//!
//! An [`Index`] is one open index file together with its node cache. It is
//! the only way callers reach the engine: `create` and `open` start a session,
//! dropping it releases the file.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::IndexConfig;
use crate::storage::btree::{BTree, BTreeError, BTreeIterator, TreeStats};
use crate::storage::{BlockStore, NodeCache, StoreError};
use crate::transfer::{self, TransferError};

/// An open index file.
pub struct Index {
    store: BlockStore,
    cache: NodeCache,
    config: IndexConfig,
}

/// Outcome of loading a pair file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of pairs inserted.
    pub inserted: usize,
    /// Keys skipped because they were already present.
    pub skipped_duplicates: Vec<u64>,
    /// Line numbers that could not be parsed.
    pub malformed_lines: Vec<usize>,
}

impl Index {
    /// Create a new, empty index file.
    ///
    /// An existing file is only replaced when `overwrite` is set.
    pub fn create(path: &Path, overwrite: bool, config: IndexConfig) -> Result<Self, IndexError> {
        let store = BlockStore::create(path, overwrite)?;
        Ok(Self::with_store(store, config))
    }

    /// Open an existing index file.
    pub fn open(path: &Path, config: IndexConfig) -> Result<Self, IndexError> {
        let store = BlockStore::open(path)?;
        Ok(Self::with_store(store, config))
    }

    fn with_store(store: BlockStore, config: IndexConfig) -> Self {
        Self {
            store,
            cache: NodeCache::new(config.cache_capacity),
            config,
        }
    }

    /// Path of the open file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Settings this session was opened with.
    #[must_use]
    pub const fn config(&self) -> IndexConfig {
        self.config
    }

    fn tree(&mut self) -> BTree<'_> {
        BTree::new(&mut self.store, &mut self.cache).with_sync_writes(self.config.sync_writes)
    }

    /// Insert a new pair; fails with `DuplicateKey` if the key exists.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<(), IndexError> {
        Ok(self.tree().insert(key, value)?)
    }

    /// Look up the value stored under `key`.
    pub fn search(&mut self, key: u64) -> Result<Option<u64>, IndexError> {
        Ok(self.tree().search(key)?)
    }

    /// Insert pairs in order, skipping keys that already exist.
    pub fn bulk_load<I>(&mut self, pairs: I) -> Result<LoadReport, IndexError>
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let report = self.tree().bulk_load(pairs)?;
        Ok(LoadReport {
            inserted: report.inserted,
            skipped_duplicates: report.skipped_duplicates,
            malformed_lines: Vec::new(),
        })
    }

    /// Load a `key,value` text file.
    ///
    /// The whole file is parsed before anything is inserted. Malformed lines
    /// and duplicate keys are skipped with a warning.
    pub fn load(&mut self, path: &Path) -> Result<LoadReport, IndexError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IndexError::NotFound(path.to_path_buf()),
            _ => IndexError::Transfer(TransferError::Io(e)),
        })?;

        let mut pairs = Vec::new();
        let mut malformed_lines = Vec::new();
        for item in transfer::read_pairs(BufReader::new(file)) {
            match item {
                Ok(pair) => pairs.push(pair),
                Err(TransferError::Malformed {
                    line_number,
                    content,
                }) => {
                    tracing::warn!(line_number, content = %content, "skipping invalid line");
                    malformed_lines.push(line_number);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut report = self.bulk_load(pairs)?;
        report.malformed_lines = malformed_lines;
        tracing::info!(
            path = %path.display(),
            inserted = report.inserted,
            duplicates = report.skipped_duplicates.len(),
            malformed = report.malformed_lines.len(),
            "loaded pairs"
        );
        Ok(report)
    }

    /// Every pair in ascending key order.
    pub fn print_all(&mut self) -> Result<Vec<(u64, u64)>, IndexError> {
        Ok(self.tree().extract()?)
    }

    /// Lazily walk every pair in ascending key order.
    pub fn traverse(&mut self) -> Result<BTreeIterator<'_>, IndexError> {
        Ok(BTreeIterator::new(&mut self.store)?)
    }

    /// Write every pair to a text file, returning the number written.
    ///
    /// An existing file is only replaced when `overwrite` is set.
    pub fn extract(&mut self, path: &Path, overwrite: bool) -> Result<usize, IndexError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => IndexError::AlreadyExists(path.to_path_buf()),
            _ => IndexError::Transfer(TransferError::Io(e)),
        })?;

        let mut writer = BufWriter::new(file);
        let mut count = 0;
        for entry in self.traverse()? {
            let (key, value) = entry?;
            transfer::write_pair(&mut writer, key, value)?;
            count += 1;
        }
        writer.flush().map_err(TransferError::Io)?;

        tracing::info!(path = %path.display(), count, "extracted pairs");
        Ok(count)
    }

    /// Check the structure of the whole tree.
    pub fn verify(&mut self) -> Result<TreeStats, IndexError> {
        Ok(self.tree().verify()?)
    }

    /// Number of stored pairs.
    pub fn len(&mut self) -> Result<usize, IndexError> {
        Ok(self.tree().len()?)
    }

    /// Whether the index holds no pairs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.store.root() == 0
    }

    /// Sync and close the file.
    pub fn close(self) -> Result<(), IndexError> {
        self.store.sync()?;
        tracing::info!(path = %self.store.path().display(), "closed index");
        Ok(())
    }
}

/// Errors that can occur during index operations.
#[derive(Debug)]
pub enum IndexError {
    /// Index file error.
    Store(StoreError),
    /// B-tree error.
    BTree(BTreeError),
    /// Pair file error.
    Transfer(TransferError),
    /// An input file does not exist.
    NotFound(PathBuf),
    /// An output file exists and may not be replaced.
    AlreadyExists(PathBuf),
}

impl IndexError {
    /// Whether this error is a rejected duplicate key.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::BTree(BTreeError::DuplicateKey(_)))
    }
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "index file error: {e}"),
            Self::BTree(e) => write!(f, "{e}"),
            Self::Transfer(e) => write!(f, "transfer error: {e}"),
            Self::NotFound(path) => write!(f, "file {} does not exist", path.display()),
            Self::AlreadyExists(path) => write!(f, "file {} already exists", path.display()),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::BTree(e) => Some(e),
            Self::Transfer(e) => Some(e),
            Self::NotFound(_) | Self::AlreadyExists(_) => None,
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<BTreeError> for IndexError {
    fn from(e: BTreeError) -> Self {
        Self::BTree(e)
    }
}

impl From<TransferError> for IndexError {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}
