//! B-tree engine over the block store.
//!
//! A classic B-tree of minimum degree D: keys and values live in every node,
//! internal nodes additionally carry child block numbers. The tree grows only
//! at the root, so all leaves stay at the same depth.
//!
//! Every operation works against the [`NodeCache`]. Mutations are collected
//! there as dirty nodes and written in one pass once all block allocations for
//! the operation have succeeded; a new root is published in the header last.
//! Any failure drops the cache so no half-applied change is ever read back.

use crate::storage::block::BlockId;
use crate::storage::btree::node::Node;
use crate::storage::cache::NodeCache;
use crate::storage::codec::CodecError;
use crate::storage::store::{BlockStore, StoreError};

/// Upper bound on tree height; deeper descents mean the file is corrupt.
pub(crate) const MAX_DEPTH: usize = 64;

/// A B-tree backed by an index file.
///
/// Borrows the session's store and cache for the duration of the calls made
/// through it.
pub struct BTree<'a> {
    store: &'a mut BlockStore,
    cache: &'a mut NodeCache,
    sync_writes: bool,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkLoadReport {
    /// Number of entries inserted.
    pub inserted: usize,
    /// Keys skipped because they were already present.
    pub skipped_duplicates: Vec<u64>,
}

impl<'a> BTree<'a> {
    /// Create an engine over an open store.
    pub const fn new(store: &'a mut BlockStore, cache: &'a mut NodeCache) -> Self {
        Self {
            store,
            cache,
            sync_writes: false,
        }
    }

    /// Fsync the file at the end of every mutating operation.
    #[must_use]
    pub const fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Get the root block number, 0 for an empty tree.
    #[must_use]
    pub const fn root_block(&self) -> BlockId {
        self.store.root()
    }

    /// Get the first unallocated block number.
    #[must_use]
    pub const fn next_block(&self) -> BlockId {
        self.store.next_block()
    }

    /// Look up a value by key.
    pub fn search(&mut self, key: u64) -> Result<Option<u64>, BTreeError> {
        let result = self.search_inner(key);
        self.finish(result)
    }

    /// Insert a new key-value pair.
    ///
    /// Returns `DuplicateKey` without touching the tree if the key exists.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<(), BTreeError> {
        let result = self.insert_inner(key, value);
        self.finish(result)
    }

    /// Insert pairs in input order, skipping keys that already exist.
    ///
    /// Duplicates are logged and reported; any other error aborts the load
    /// with every earlier insert already durable.
    pub fn bulk_load<I>(&mut self, entries: I) -> Result<BulkLoadReport, BTreeError>
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let mut report = BulkLoadReport::default();
        for (key, value) in entries {
            match self.insert(key, value) {
                Ok(()) => report.inserted += 1,
                Err(BTreeError::DuplicateKey(key)) => {
                    tracing::warn!(key, "key already exists, skipping");
                    report.skipped_duplicates.push(key);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Create an iterator over all entries in ascending key order.
    ///
    /// Each call starts a fresh walk from the root.
    pub fn iter(&mut self) -> Result<BTreeIterator<'_>, BTreeError> {
        BTreeIterator::new(&mut *self.store)
    }

    /// Collect every entry in ascending key order.
    pub fn extract(&mut self) -> Result<Vec<(u64, u64)>, BTreeError> {
        self.iter()?.collect()
    }

    /// Count the total number of entries in the tree.
    pub fn len(&mut self) -> Result<usize, BTreeError> {
        let mut count = 0;
        for entry in self.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether the tree holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.store.root() == 0
    }

    fn search_inner(&mut self, key: u64) -> Result<Option<u64>, BTreeError> {
        let mut block_id = self.store.root();
        if block_id == 0 {
            return Ok(None);
        }

        for _ in 0..MAX_DEPTH {
            let node = self.load(block_id)?;
            match node.find(key) {
                Ok(i) => return Ok(Some(node.values[i])),
                Err(_) if node.is_leaf() => return Ok(None),
                Err(i) => block_id = node.children[i],
            }
        }

        Err(too_deep(block_id))
    }

    fn insert_inner(&mut self, key: u64, value: u64) -> Result<(), BTreeError> {
        let root = self.store.root();
        if root == 0 {
            let block_id = self.store.allocate_block()?;
            let mut leaf = Node::new_leaf(block_id, 0);
            leaf.insert_entry(0, key, value, 0);
            self.cache.put_dirty(leaf);
            tracing::debug!(block_id, "created root leaf");
            return self.flush(Some(block_id));
        }

        // Internal nodes on the way down, with the child index taken.
        let mut path: Vec<(BlockId, usize)> = Vec::new();
        let mut node = self.load(root)?;
        let mut index = loop {
            match node.find(key) {
                Ok(_) => return Err(BTreeError::DuplicateKey(key)),
                Err(i) if node.is_leaf() => break i,
                Err(i) => {
                    if path.len() >= MAX_DEPTH {
                        return Err(too_deep(node.block_id));
                    }
                    path.push((node.block_id, i));
                    node = self.load(node.children[i])?;
                }
            }
        };

        let (mut key, mut value, mut right_child) = (key, value, 0);
        let mut new_root = None;

        loop {
            if !node.is_full() {
                node.insert_entry(index, key, value, right_child);
                self.cache.put_dirty(node);
                break;
            }

            let sibling_block = self.store.allocate_block()?;
            let split = node.split_insert(index, key, value, right_child, sibling_block);
            tracing::debug!(
                block_id = node.block_id,
                sibling_block,
                promoted = split.key,
                "split node"
            );

            // Children that moved to the sibling now answer to it.
            for &child in split.sibling.children() {
                let mut child_node = self.load(child)?;
                child_node.parent = sibling_block;
                self.cache.put_dirty(child_node);
            }

            let left_block = node.block_id;
            let mut sibling = split.sibling;

            if let Some((parent_block, child_index)) = path.pop() {
                self.cache.put_dirty(node);
                self.cache.put_dirty(sibling);

                node = self.load(parent_block)?;
                index = child_index;
                key = split.key;
                value = split.value;
                right_child = sibling_block;
            } else {
                let root_block = self.store.allocate_block()?;
                node.parent = root_block;
                sibling.parent = root_block;
                self.cache.put_dirty(node);
                self.cache.put_dirty(sibling);
                self.cache.put_dirty(Node::new_root(
                    root_block,
                    split.key,
                    split.value,
                    left_block,
                    sibling_block,
                ));

                tracing::info!(root_block, "root split, tree grew a level");
                new_root = Some(root_block);
                break;
            }
        }

        self.flush(new_root)
    }

    /// Load a node through the cache.
    pub(super) fn load(&mut self, block_id: BlockId) -> Result<Node, BTreeError> {
        if let Some(node) = self.cache.get(block_id) {
            return Ok(node.clone());
        }
        let node = read_node(self.store, block_id)?;
        self.cache.insert_clean(node.clone());
        Ok(node)
    }

    /// Write every dirty node, then publish a new root if there is one.
    fn flush(&mut self, new_root: Option<BlockId>) -> Result<(), BTreeError> {
        for node in self.cache.take_dirty() {
            self.store.write_block(node.block_id, &node.to_block())?;
        }
        if let Some(root_block) = new_root {
            self.store.set_root(root_block)?;
        }
        if self.sync_writes {
            self.store.sync()?;
        }
        Ok(())
    }

    /// Settle the cache after an operation.
    ///
    /// Rejected duplicates never mutate anything; every other failure may
    /// have left dirty nodes behind, so the cache is dropped wholesale.
    pub(super) fn finish<T>(&mut self, result: Result<T, BTreeError>) -> Result<T, BTreeError> {
        match &result {
            Ok(_) | Err(BTreeError::DuplicateKey(_)) => self.cache.trim(),
            Err(_) => self.cache.clear(),
        }
        result
    }
}

/// Read and decode a node straight from the store.
pub(crate) fn read_node(store: &mut BlockStore, block_id: BlockId) -> Result<Node, BTreeError> {
    let block = store.read_block(block_id)?;
    let node = Node::from_bytes(block.as_bytes())?;
    if node.block_id != block_id {
        return Err(BTreeError::CorruptTree(format!(
            "block {block_id} is labelled as block {}",
            node.block_id
        )));
    }
    Ok(node)
}

fn too_deep(block_id: BlockId) -> BTreeError {
    BTreeError::CorruptTree(format!(
        "descent passed {MAX_DEPTH} levels at block {block_id}"
    ))
}

/// Iterator over B-tree entries in ascending key order.
///
/// Holds only the current root-to-leaf path.
pub struct BTreeIterator<'a> {
    store: &'a mut BlockStore,
    /// Nodes on the current path with the index of their next entry.
    stack: Vec<(Node, usize)>,
}

impl<'a> BTreeIterator<'a> {
    /// Start a walk from the store's current root.
    ///
    /// Reads go straight to the store, so the caller must not hold unflushed
    /// nodes in a cache.
    pub fn new(store: &'a mut BlockStore) -> Result<Self, BTreeError> {
        let root = store.root();
        let mut iter = Self {
            store,
            stack: Vec::new(),
        };
        if root != 0 {
            iter.push_leftmost(root)?;
        }
        Ok(iter)
    }

    /// Get the next entry.
    pub fn next_entry(&mut self) -> Result<Option<(u64, u64)>, BTreeError> {
        loop {
            let Some((node, next)) = self.stack.last_mut() else {
                return Ok(None);
            };

            if *next < node.key_count {
                let i = *next;
                *next += 1;
                let entry = (node.keys[i], node.values[i]);
                if !node.is_leaf() {
                    let child = node.children[i + 1];
                    self.push_leftmost(child)?;
                }
                return Ok(Some(entry));
            }

            self.stack.pop();
        }
    }

    /// Push `block_id` and its leftmost descendants onto the stack.
    fn push_leftmost(&mut self, mut block_id: BlockId) -> Result<(), BTreeError> {
        loop {
            if self.stack.len() >= MAX_DEPTH {
                return Err(too_deep(block_id));
            }
            let node = read_node(self.store, block_id)?;
            let leaf = node.is_leaf();
            let first_child = node.children[0];
            self.stack.push((node, 0));
            if leaf {
                return Ok(());
            }
            block_id = first_child;
        }
    }
}

impl Iterator for BTreeIterator<'_> {
    type Item = Result<(u64, u64), BTreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                // fuse after an error
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

/// Errors that can occur during B-tree operations.
#[derive(Debug)]
pub enum BTreeError {
    /// Block store error.
    Store(StoreError),
    /// A node block could not be decoded.
    Codec(CodecError),
    /// The key is already present.
    DuplicateKey(u64),
    /// The file does not hold a well-formed tree.
    CorruptTree(String),
}

impl std::fmt::Display for BTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Codec(e) => write!(f, "invalid node block: {e}"),
            Self::DuplicateKey(key) => write!(f, "key {key} already exists"),
            Self::CorruptTree(msg) => write!(f, "corrupt tree: {msg}"),
        }
    }
}

impl std::error::Error for BTreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::DuplicateKey(_) | Self::CorruptTree(_) => None,
        }
    }
}

impl From<StoreError> for BTreeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<CodecError> for BTreeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree::node::{MAX_KEYS, MIN_DEGREE, MIN_KEYS};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use tempfile::tempdir;

    #[allow(clippy::expect_used)]
    fn create_test_store() -> (tempfile::TempDir, BlockStore) {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.idx");
        let store = BlockStore::create(&path, false).expect("create store");
        (dir, store)
    }

    #[test]
    fn test_btree_basic_operations() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        assert!(tree.is_empty());
        assert_eq!(tree.search(1).expect("search empty"), None);

        tree.insert(2, 20).expect("insert 2");
        tree.insert(1, 10).expect("insert 1");
        tree.insert(3, 30).expect("insert 3");

        assert_eq!(tree.search(1).expect("get 1"), Some(10));
        assert_eq!(tree.search(2).expect("get 2"), Some(20));
        assert_eq!(tree.search(3).expect("get 3"), Some(30));
        assert_eq!(tree.search(4).expect("get 4"), None);
        assert_eq!(tree.root_block(), 1);
    }

    #[test]
    fn test_btree_duplicate_rejected() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        tree.insert(7, 70).expect("insert");
        let result = tree.insert(7, 99);
        assert!(matches!(result, Err(BTreeError::DuplicateKey(7))));
        assert_eq!(tree.search(7).expect("search"), Some(70));
        assert_eq!(tree.len().expect("len"), 1);
    }

    #[test]
    fn test_first_split_happens_at_2d_entries() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        for key in 1..=MAX_KEYS as u64 {
            tree.insert(key, key).expect("insert");
        }
        // 2D - 1 entries still fit in the root leaf
        assert_eq!(tree.root_block(), 1);

        tree.insert(MAX_KEYS as u64 + 1, 0).expect("insert");
        // leaf 1, sibling 2, new root 3
        assert_eq!(tree.root_block(), 3);

        let root = tree.load(3).expect("load root");
        assert_eq!(root.keys(), &[MIN_DEGREE as u64]);
        assert_eq!(root.children(), &[1, 2]);
        assert_eq!(tree.load(1).expect("left").key_count, MIN_KEYS);
        assert_eq!(tree.load(2).expect("right").key_count, MIN_DEGREE);
        assert_eq!(tree.load(1).expect("left").parent, 3);
        assert_eq!(tree.load(2).expect("right").parent, 3);
    }

    #[test]
    fn test_btree_iteration() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        for i in [5u64, 3, 7, 1, 9, 2, 8, 4, 6, 0] {
            tree.insert(i, i * 100).expect("insert");
        }

        let entries = tree.extract().expect("extract");
        let expected: Vec<(u64, u64)> = (0..10).map(|i| (i, i * 100)).collect();
        assert_eq!(entries, expected);

        // restartable
        assert_eq!(tree.extract().expect("extract again"), expected);
    }

    #[test]
    fn test_iterate_empty_tree() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        let mut iter = tree.iter().expect("iter");
        assert_eq!(iter.next_entry().expect("next"), None);
        assert!(tree.extract().expect("extract").is_empty());
    }

    #[test]
    fn test_btree_many_inserts_shuffled() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::new(8);
        let mut tree = BTree::new(&mut store, &mut cache);

        let mut keys: Vec<u64> = (0..2_000).map(|i| i * 3 + 1).collect();
        keys.shuffle(&mut StdRng::seed_from_u64(0x4337));

        for &key in &keys {
            tree.insert(key, key ^ 0xFFFF).expect("insert");
        }

        assert_eq!(tree.len().expect("len"), keys.len());
        for &key in &keys {
            assert_eq!(tree.search(key).expect("search"), Some(key ^ 0xFFFF));
            assert_eq!(tree.search(key + 1).expect("search miss"), None);
        }

        let entries = tree.extract().expect("extract");
        assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        let stats = tree.verify().expect("verify");
        assert_eq!(stats.entry_count, keys.len());
        assert!(stats.height >= 3);
    }

    #[test]
    fn test_btree_descending_inserts_split_left_edge() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        for key in (0..1_000u64).rev() {
            tree.insert(key, key).expect("insert");
        }

        let stats = tree.verify().expect("verify");
        assert_eq!(stats.entry_count, 1_000);
        let keys: Vec<u64> = tree.extract().expect("extract").into_iter().map(|e| e.0).collect();
        assert_eq!(keys, (0..1_000).collect::<Vec<_>>());
    }

    #[test]
    fn test_bulk_load_reports_duplicates() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::default();
        let mut tree = BTree::new(&mut store, &mut cache);

        let report = tree
            .bulk_load([(5, 50), (1, 10), (5, 51), (9, 90), (1, 11)])
            .expect("bulk load");

        assert_eq!(report.inserted, 3);
        assert_eq!(report.skipped_duplicates, vec![5, 1]);
        assert_eq!(tree.search(5).expect("search"), Some(50));
        assert_eq!(tree.search(1).expect("search"), Some(10));
    }

    #[test]
    fn test_btree_persistence() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.idx");

        {
            let mut store = BlockStore::create(&path, false).expect("create store");
            let mut cache = NodeCache::default();
            let mut tree = BTree::new(&mut store, &mut cache).with_sync_writes(true);
            for key in 0..500u64 {
                tree.insert(key * 7 % 500, key).expect("insert");
            }
        }

        {
            let mut store = BlockStore::open(&path).expect("open store");
            let mut cache = NodeCache::default();
            let mut tree = BTree::new(&mut store, &mut cache);

            for key in 0..500u64 {
                assert_eq!(tree.search(key * 7 % 500).expect("search"), Some(key));
            }
            assert_eq!(tree.len().expect("len"), 500);
            tree.verify().expect("verify");
        }
    }

    #[test]
    fn test_mislabelled_block_is_corrupt() {
        let (_dir, mut store) = create_test_store();
        let mut cache = NodeCache::new(0);
        {
            let mut tree = BTree::new(&mut store, &mut cache);
            tree.insert(1, 1).expect("insert");
        }

        let mut node = read_node(&mut store, 1).expect("read");
        node.block_id = 9;
        store.write_block(1, &node.to_block()).expect("write");

        let mut tree = BTree::new(&mut store, &mut cache);
        assert!(matches!(tree.search(1), Err(BTreeError::CorruptTree(_))));
    }

    #[test]
    fn test_btree_error_display() {
        assert_eq!(
            BTreeError::DuplicateKey(42).to_string(),
            "key 42 already exists"
        );
        let e = BTreeError::from(StoreError::BlockOutOfRange {
            block_id: 3,
            total_blocks: 1,
        });
        assert!(e.to_string().contains("block 3"));
    }
}
