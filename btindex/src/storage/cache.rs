//! Node cache for decoded B-tree nodes.
//!
//! The cache sits between the engine and the block store. During one
//! operation every node the engine touches lives here; mutated nodes are
//! marked dirty and only reach disk when the engine flushes them at the end of
//! the operation.
//!
//! # Design
//!
//! - `HashMap` from block number to entry, plus a FIFO of clean block numbers
//!   for eviction
//! - Dirty entries are never evicted; `take_dirty` hands them to the flusher
//! - `trim` runs between operations and keeps at most `capacity` clean nodes
//!
//! # Invariants
//!
//! - A block number appears at most once in the map
//! - Every clean entry appears exactly once in `clean_order`
//! - After `trim`, `len() <= capacity + dirty_count()`

use std::collections::{HashMap, VecDeque};

use crate::storage::block::BlockId;
use crate::storage::btree::Node;

/// Default number of clean nodes retained between operations.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug)]
struct CacheEntry {
    node: Node,
    dirty: bool,
}

/// In-memory map from block number to decoded node.
#[derive(Debug)]
pub struct NodeCache {
    entries: HashMap<BlockId, CacheEntry>,
    /// Clean block numbers, oldest first.
    clean_order: VecDeque<BlockId>,
    capacity: usize,
}

impl NodeCache {
    /// Create a cache that retains up to `capacity` clean nodes between
    /// operations. A capacity of 0 retains nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            clean_order: VecDeque::new(),
            capacity,
        }
    }

    /// Look up a cached node.
    #[must_use]
    pub fn get(&self, block_id: BlockId) -> Option<&Node> {
        self.entries.get(&block_id).map(|e| &e.node)
    }

    /// Cache a node just read from disk.
    ///
    /// An existing dirty entry for the same block wins over the disk copy.
    pub fn insert_clean(&mut self, node: Node) {
        let block_id = node.block_id;
        if self.entries.get(&block_id).is_some_and(|e| e.dirty) {
            return;
        }
        if self
            .entries
            .insert(block_id, CacheEntry { node, dirty: false })
            .is_none()
        {
            self.clean_order.push_back(block_id);
        }
    }

    /// Store a modified node that must be written before the operation ends.
    pub fn put_dirty(&mut self, node: Node) {
        let block_id = node.block_id;
        let previous = self
            .entries
            .insert(block_id, CacheEntry { node, dirty: true });
        if previous.is_some_and(|e| !e.dirty) {
            self.clean_order.retain(|&id| id != block_id);
        }
    }

    /// Remove and return every dirty node, ordered by block number.
    ///
    /// The flushed nodes are re-inserted as clean entries so later reads in
    /// the same session can still hit them.
    pub fn take_dirty(&mut self) -> Vec<Node> {
        let mut dirty: Vec<Node> = self
            .entries
            .values_mut()
            .filter(|e| e.dirty)
            .map(|e| {
                e.dirty = false;
                e.node.clone()
            })
            .collect();
        dirty.sort_unstable_by_key(|n| n.block_id);
        self.clean_order.extend(dirty.iter().map(|n| n.block_id));
        dirty
    }

    /// Evict the oldest clean entries until at most `capacity` remain.
    pub fn trim(&mut self) {
        while self.clean_order.len() > self.capacity {
            if let Some(block_id) = self.clean_order.pop_front() {
                self.entries.remove(&block_id);
            }
        }
    }

    /// Drop every entry, dirty or not.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.clean_order.clear();
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of dirty nodes awaiting a flush.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.entries.values().filter(|e| e.dirty).count()
    }

    /// Configured clean capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
