//! Disk-based B-tree over `u64` keys and values.
//!
//! # Structure
//!
//! A classic B-tree of minimum degree 10: every node, internal or leaf, holds
//! up to 19 key-value pairs, and internal nodes hold one more child than keys.
//! Each node occupies exactly one block and records its own block number and
//! its parent's.
//!
//! # Usage
//!
//! ```
//! use btindex::storage::btree::BTree;
//! use btindex::storage::{BlockStore, NodeCache};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut store = BlockStore::create(&dir.path().join("doc.idx"), false).unwrap();
//! let mut cache = NodeCache::default();
//! let mut tree = BTree::new(&mut store, &mut cache);
//!
//! tree.insert(15, 100).unwrap();
//! assert_eq!(tree.search(15).unwrap(), Some(100));
//! assert_eq!(tree.search(16).unwrap(), None);
//! ```

mod node;
mod tree;
mod verify;

pub use node::{MAX_CHILDREN, MAX_KEYS, MIN_DEGREE, MIN_KEYS, Node, Split};
pub use tree::{BTree, BTreeError, BTreeIterator, BulkLoadReport};
pub use verify::TreeStats;
