//! Single-file B-tree index storage.
//!
//! # File Format
//!
//! The index is stored in one file of 512-byte blocks:
//!
//! - Block 0: header (magic `4337PRJ3`, root block, next free block)
//! - Blocks 1..next: B-tree nodes, one node per block
//!
//! Blocks are never freed. All integers are 8-byte big-endian.
//!
//! # Layers
//!
//! - [`codec`]: pure block encoding and decoding
//! - [`BlockStore`]: block I/O and the header
//! - [`NodeCache`]: decoded nodes and dirty tracking for one session
//! - [`btree`]: the search tree itself

mod block;
mod cache;
pub mod btree;
pub mod codec;
mod header;
mod store;

pub use block::{BLOCK_SIZE, Block, BlockId, HEADER_BLOCK};
pub use cache::{DEFAULT_CACHE_CAPACITY, NodeCache};
pub use codec::CodecError;
pub use header::{FIRST_NODE_BLOCK, Header, MAGIC};
pub use store::{BlockStore, StoreError};
