//! Structural checks over a whole tree.
//!
//! Walks every reachable node once and confirms the properties the engine
//! relies on:
//!
//! - keys strictly ascend within a node and sit between the separators of
//!   the parent entry that points at it
//! - every leaf sits at the same depth
//! - every non-root node holds at least D - 1 keys; the root holds at least one
//! - parent pointers match the node that references the child
//! - no block is reachable twice and every block lies below `next_block`

use std::collections::HashSet;

use crate::storage::block::BlockId;
use crate::storage::btree::node::MIN_KEYS;
use crate::storage::btree::tree::{BTree, BTreeError, MAX_DEPTH};

/// Shape of a verified tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels, 0 for an empty tree.
    pub height: usize,
    /// Number of nodes reachable from the root.
    pub node_count: usize,
    /// Number of key-value pairs.
    pub entry_count: usize,
}

struct Pending {
    block_id: BlockId,
    parent: BlockId,
    depth: usize,
    /// Exclusive lower bound for every key in the subtree.
    lower: Option<u64>,
    /// Exclusive upper bound for every key in the subtree.
    upper: Option<u64>,
}

impl BTree<'_> {
    /// Check every structural invariant of the tree.
    ///
    /// Returns `CorruptTree` describing the first violation found.
    pub fn verify(&mut self) -> Result<TreeStats, BTreeError> {
        let result = self.verify_inner();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "tree verification failed");
        }
        self.finish(result)
    }

    fn verify_inner(&mut self) -> Result<TreeStats, BTreeError> {
        let root = self.root_block();
        let next_block = self.next_block();
        let mut stats = TreeStats::default();
        if root == 0 {
            return Ok(stats);
        }

        let mut visited = HashSet::new();
        let mut leaf_depth = None;
        let mut stack = vec![Pending {
            block_id: root,
            parent: 0,
            depth: 1,
            lower: None,
            upper: None,
        }];

        while let Some(item) = stack.pop() {
            let block_id = item.block_id;
            if block_id == 0 || block_id >= next_block {
                return Err(corrupt(format!(
                    "block {block_id} is outside the allocated range 1..{next_block}"
                )));
            }
            if !visited.insert(block_id) {
                return Err(corrupt(format!("block {block_id} is reachable twice")));
            }
            if item.depth > MAX_DEPTH {
                return Err(corrupt(format!("block {block_id} is deeper than {MAX_DEPTH}")));
            }

            let node = self.load(block_id)?;
            if node.parent != item.parent {
                return Err(corrupt(format!(
                    "block {block_id} names parent {} but is referenced by {}",
                    node.parent, item.parent
                )));
            }

            let keys = node.keys();
            if keys.is_empty() {
                return Err(corrupt(format!("block {block_id} has no keys")));
            }
            if item.parent != 0 && keys.len() < MIN_KEYS {
                return Err(corrupt(format!(
                    "block {block_id} has {} keys, below the minimum of {MIN_KEYS}",
                    keys.len()
                )));
            }
            if keys.windows(2).any(|w| w[0] >= w[1]) {
                return Err(corrupt(format!("block {block_id} keys are not ascending")));
            }
            let (first, last) = (keys[0], keys[keys.len() - 1]);
            if item.lower.is_some_and(|lower| first <= lower)
                || item.upper.is_some_and(|upper| last >= upper)
            {
                return Err(corrupt(format!(
                    "block {block_id} keys {first}..={last} fall outside their separators"
                )));
            }

            stats.node_count += 1;
            stats.entry_count += keys.len();

            if node.is_leaf() {
                if node.children.iter().any(|&c| c != 0) {
                    return Err(corrupt(format!(
                        "leaf block {block_id} carries child pointers"
                    )));
                }
                match leaf_depth {
                    None => leaf_depth = Some(item.depth),
                    Some(depth) if depth != item.depth => {
                        return Err(corrupt(format!(
                            "leaf block {block_id} at depth {} but other leaves at depth {depth}",
                            item.depth
                        )));
                    }
                    Some(_) => {}
                }
                continue;
            }

            for (i, &child) in node.children().iter().enumerate() {
                stack.push(Pending {
                    block_id: child,
                    parent: block_id,
                    depth: item.depth + 1,
                    lower: if i == 0 { item.lower } else { Some(keys[i - 1]) },
                    upper: keys.get(i).copied().or(item.upper),
                });
            }
        }

        stats.height = leaf_depth.unwrap_or(0);
        Ok(stats)
    }
}

fn corrupt(msg: String) -> BTreeError {
    BTreeError::CorruptTree(msg)
}
