//! B-tree node type and serialization.
//!
//! Every node is stored in its own 512-byte block with fixed-capacity key,
//! value and child arrays plus an explicit key count:
//!
//! - `[0, 8)`: block id (self-identifying)
//! - `[8, 16)`: parent block id (0 for the root)
//! - `[16, 24)`: key count `n`
//! - `[24, 176)`: 19 keys
//! - `[176, 328)`: 19 values
//! - `[328, 488)`: 20 child block ids
//! - `[488, 512)`: zero
//!
//! Only the first `n` keys/values and the first `n + 1` children are
//! significant. A leaf has every child slot set to 0.

#![allow(clippy::cast_possible_truncation)]

use crate::storage::block::{BLOCK_SIZE, Block, BlockId};
use crate::storage::codec::CodecError;

/// Minimum degree of the tree.
pub const MIN_DEGREE: usize = 10;

/// Maximum number of keys in a node (2D - 1).
pub const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;

/// Maximum number of children in a node (2D).
pub const MAX_CHILDREN: usize = 2 * MIN_DEGREE;

/// Minimum number of keys in any node except the root (D - 1).
pub const MIN_KEYS: usize = MIN_DEGREE - 1;

/// Node field offsets.
mod offsets {
    use super::{MAX_CHILDREN, MAX_KEYS};

    pub const BLOCK_ID: usize = 0;
    pub const PARENT: usize = 8;
    pub const KEY_COUNT: usize = 16;
    pub const KEYS: usize = 24;
    pub const VALUES: usize = KEYS + MAX_KEYS * 8;
    pub const CHILDREN: usize = VALUES + MAX_KEYS * 8;
    pub const END: usize = CHILDREN + MAX_CHILDREN * 8;
}

const _: () = assert!(offsets::END <= BLOCK_SIZE);

/// A B-tree node as stored in one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub block_id: BlockId,
    pub parent: BlockId,
    pub key_count: usize,
    pub keys: [u64; MAX_KEYS],
    pub values: [u64; MAX_KEYS],
    pub children: [BlockId; MAX_CHILDREN],
}

/// The result of splitting an overflowing node.
#[derive(Debug)]
pub struct Split {
    /// Key promoted to the parent.
    pub key: u64,
    /// Value paired with the promoted key.
    pub value: u64,
    /// New right-hand sibling, already addressed to its allocated block.
    pub sibling: Node,
}

impl Node {
    /// Create an empty leaf.
    #[must_use]
    pub const fn new_leaf(block_id: BlockId, parent: BlockId) -> Self {
        Self {
            block_id,
            parent,
            key_count: 0,
            keys: [0; MAX_KEYS],
            values: [0; MAX_KEYS],
            children: [0; MAX_CHILDREN],
        }
    }

    /// Create a root holding a single entry between two children.
    #[must_use]
    pub const fn new_root(
        block_id: BlockId,
        key: u64,
        value: u64,
        left_child: BlockId,
        right_child: BlockId,
    ) -> Self {
        let mut node = Self::new_leaf(block_id, 0);
        node.key_count = 1;
        node.keys[0] = key;
        node.values[0] = value;
        node.children[0] = left_child;
        node.children[1] = right_child;
        node
    }

    /// Whether this node has no children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children[0] == 0
    }

    /// Whether inserting another entry would overflow the node.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.key_count >= MAX_KEYS
    }

    /// The significant keys.
    #[must_use]
    pub fn keys(&self) -> &[u64] {
        &self.keys[..self.key_count]
    }

    /// The significant values.
    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values[..self.key_count]
    }

    /// The significant children (empty for a leaf).
    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        if self.is_leaf() {
            &[]
        } else {
            &self.children[..=self.key_count]
        }
    }

    /// Binary search the significant keys.
    ///
    /// `Ok(i)` is an exact match at `i`; `Err(i)` is both the insertion
    /// position and the index of the child to descend into.
    pub fn find(&self, key: u64) -> Result<usize, usize> {
        self.keys().binary_search(&key)
    }

    /// Insert an entry at `index`, placing `right_child` just after it.
    ///
    /// `right_child` is ignored for leaves. The node must not be full.
    pub fn insert_entry(&mut self, index: usize, key: u64, value: u64, right_child: BlockId) {
        debug_assert!(!self.is_full(), "insert_entry on a full node");
        debug_assert!(index <= self.key_count);

        let n = self.key_count;
        self.keys.copy_within(index..n, index + 1);
        self.values.copy_within(index..n, index + 1);
        self.keys[index] = key;
        self.values[index] = value;

        if !self.is_leaf() {
            self.children.copy_within(index + 1..=n, index + 2);
            self.children[index + 1] = right_child;
        }

        self.key_count += 1;
    }

    /// Insert an entry into a full node and split it.
    ///
    /// The 2D entries are laid out in order; the entry at index D - 1 is
    /// promoted, entries `[0, D - 1)` and the first D children stay in `self`,
    /// entries `[D, 2D)` and the remaining D + 1 children move to the sibling
    /// at `sibling_block`. The sibling inherits `self`'s parent.
    pub fn split_insert(
        &mut self,
        index: usize,
        key: u64,
        value: u64,
        right_child: BlockId,
        sibling_block: BlockId,
    ) -> Split {
        debug_assert!(self.is_full(), "split_insert on a node with room");

        let leaf = self.is_leaf();
        let mut keys = [0u64; MAX_KEYS + 1];
        let mut values = [0u64; MAX_KEYS + 1];
        let mut children: [BlockId; MAX_CHILDREN + 1] = [0; MAX_CHILDREN + 1];

        keys[..index].copy_from_slice(&self.keys[..index]);
        keys[index] = key;
        keys[index + 1..].copy_from_slice(&self.keys[index..]);
        values[..index].copy_from_slice(&self.values[..index]);
        values[index] = value;
        values[index + 1..].copy_from_slice(&self.values[index..]);
        if !leaf {
            children[..=index].copy_from_slice(&self.children[..=index]);
            children[index + 1] = right_child;
            children[index + 2..].copy_from_slice(&self.children[index + 1..]);
        }

        let mid = MIN_DEGREE - 1;
        let right_len = MAX_KEYS - mid;

        let mut sibling = Self::new_leaf(sibling_block, self.parent);
        sibling.key_count = right_len;
        sibling.keys[..right_len].copy_from_slice(&keys[mid + 1..]);
        sibling.values[..right_len].copy_from_slice(&values[mid + 1..]);
        if !leaf {
            sibling.children[..=right_len].copy_from_slice(&children[mid + 1..]);
        }

        self.keys = [0; MAX_KEYS];
        self.values = [0; MAX_KEYS];
        self.children = [0; MAX_CHILDREN];
        self.keys[..mid].copy_from_slice(&keys[..mid]);
        self.values[..mid].copy_from_slice(&values[..mid]);
        if !leaf {
            self.children[..=mid].copy_from_slice(&children[..=mid]);
        }
        self.key_count = mid;

        Split {
            key: keys[mid],
            value: values[mid],
            sibling,
        }
    }

    /// Serialize the node to a block.
    #[must_use]
    pub fn to_block(&self) -> Block {
        let mut block = Block::new();
        block.write_u64(offsets::BLOCK_ID, self.block_id);
        block.write_u64(offsets::PARENT, self.parent);
        block.write_u64(offsets::KEY_COUNT, self.key_count as u64);

        for (i, key) in self.keys.iter().enumerate() {
            block.write_u64(offsets::KEYS + i * 8, *key);
        }
        for (i, value) in self.values.iter().enumerate() {
            block.write_u64(offsets::VALUES + i * 8, *value);
        }
        for (i, child) in self.children.iter().enumerate() {
            block.write_u64(offsets::CHILDREN + i * 8, *child);
        }

        block
    }

    /// Deserialize a node from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; BLOCK_SIZE] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidLength(bytes.len()))?;
        let block = Block::from_bytes(bytes);

        let block_id = block.read_u64(offsets::BLOCK_ID);
        let key_count = block.read_u64(offsets::KEY_COUNT);
        if key_count > MAX_KEYS as u64 {
            return Err(CodecError::InvalidKeyCount {
                block_id,
                key_count,
            });
        }

        let mut node = Self::new_leaf(block_id, block.read_u64(offsets::PARENT));
        node.key_count = key_count as usize;
        for i in 0..MAX_KEYS {
            node.keys[i] = block.read_u64(offsets::KEYS + i * 8);
            node.values[i] = block.read_u64(offsets::VALUES + i * 8);
        }
        for i in 0..MAX_CHILDREN {
            node.children[i] = block.read_u64(offsets::CHILDREN + i * 8);
        }

        Ok(node)
    }
}
