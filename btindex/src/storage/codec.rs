//! Block codec: pure conversions between logical records and 512-byte blocks.
//!
//! No I/O happens here. The store hands raw bytes in and out; the engine only
//! ever sees decoded [`Header`] and [`Node`] values.

use crate::storage::block::{BLOCK_SIZE, BlockId};
use crate::storage::btree::Node;
use crate::storage::header::Header;

/// Encode a header block.
#[must_use]
pub fn encode_header(root_block: BlockId, next_block: BlockId) -> [u8; BLOCK_SIZE] {
    *Header {
        root_block,
        next_block,
    }
    .to_block()
    .as_bytes()
}

/// Decode a header block into `(root_block, next_block)`.
pub fn decode_header(bytes: &[u8]) -> Result<(BlockId, BlockId), CodecError> {
    let header = Header::from_bytes(bytes)?;
    Ok((header.root_block, header.next_block))
}

/// Encode a node block.
#[must_use]
pub fn encode_node(node: &Node) -> [u8; BLOCK_SIZE] {
    *node.to_block().as_bytes()
}

/// Decode a node block.
pub fn decode_node(bytes: &[u8]) -> Result<Node, CodecError> {
    Node::from_bytes(bytes)
}

/// Errors raised when a block does not hold a well-formed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not exactly one block long.
    InvalidLength(usize),
    /// Header magic does not match.
    InvalidMagic([u8; 8]),
    /// Node key count exceeds the fixed capacity.
    InvalidKeyCount { block_id: BlockId, key_count: u64 },
    /// Header pointers cannot describe a valid file.
    InconsistentHeader {
        root_block: BlockId,
        next_block: BlockId,
    },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "invalid block length: {len} bytes (expected {BLOCK_SIZE})")
            }
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::InvalidKeyCount {
                block_id,
                key_count,
            } => write!(f, "block {block_id} has invalid key count {key_count}"),
            Self::InconsistentHeader {
                root_block,
                next_block,
            } => write!(
                f,
                "inconsistent header: root block {root_block}, next block {next_block}"
            ),
        }
    }
}

impl std::error::Error for CodecError {}
