//! Header structure and serialization.
//!
//! The header occupies block 0 and records where the tree starts and which
//! block number will be handed out next.

use crate::storage::block::{BLOCK_SIZE, Block, BlockId, MAX_BLOCKS};
use crate::storage::codec::CodecError;

/// Magic number identifying an index file: "4337PRJ3"
pub const MAGIC: [u8; 8] = *b"4337PRJ3";

/// First block number available for nodes.
pub const FIRST_NODE_BLOCK: BlockId = 1;

/// Header field offsets.
mod offsets {
    pub const MAGIC: usize = 0;
    pub const ROOT_BLOCK: usize = 8;
    pub const NEXT_BLOCK: usize = 16;
    // 24-511: zero padding
}

/// The header contains all metadata about the index file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Header {
    /// Block number of the root node, 0 when the tree is empty.
    pub root_block: BlockId,
    /// Next block number that `allocate_block` will hand out.
    pub next_block: BlockId,
}

impl Header {
    /// Create a header for a freshly created, empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_block: 0,
            next_block: FIRST_NODE_BLOCK,
        }
    }

    /// Serialize the header to a block.
    #[must_use]
    pub fn to_block(&self) -> Block {
        let mut block = Block::new();
        block.write_bytes(offsets::MAGIC, &MAGIC);
        block.write_u64(offsets::ROOT_BLOCK, self.root_block);
        block.write_u64(offsets::NEXT_BLOCK, self.next_block);
        block
    }

    /// Deserialize a header from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; BLOCK_SIZE] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidLength(bytes.len()))?;
        let block = Block::from_bytes(bytes);

        let mut magic = [0u8; 8];
        magic.copy_from_slice(block.read_bytes(offsets::MAGIC, 8));
        if magic != MAGIC {
            return Err(CodecError::InvalidMagic(magic));
        }

        Ok(Self {
            root_block: block.read_u64(offsets::ROOT_BLOCK),
            next_block: block.read_u64(offsets::NEXT_BLOCK),
        })
    }

    /// Check that the header describes a usable file.
    ///
    /// The codec accepts any root/next pair; this is the stricter check applied
    /// when opening a file.
    pub const fn validate(&self) -> Result<(), CodecError> {
        if self.next_block < FIRST_NODE_BLOCK
            || self.next_block > MAX_BLOCKS
            || self.root_block >= self.next_block
        {
            return Err(CodecError::InconsistentHeader {
                root_block: self.root_block,
                next_block: self.next_block,
            });
        }
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}
