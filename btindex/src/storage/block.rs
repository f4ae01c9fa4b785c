//! Block types and constants for the storage engine.
//!
//! The index file is a sequence of fixed 512-byte blocks. Block 0 holds the
//! header; every other block holds exactly one B-tree node.

/// Block size in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Block size as u64 for offset calculations.
pub const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

/// A block identifier (0-indexed block number).
///
/// Block 0 is the header, so 0 doubles as the "no block" marker in node
/// parent and child fields.
pub type BlockId = u64;

/// The block number reserved for the file header.
pub const HEADER_BLOCK: BlockId = 0;

/// Number of blocks whose byte range fits in a u64 file offset.
pub const MAX_BLOCKS: u64 = u64::MAX / BLOCK_SIZE_U64;

/// A raw block buffer.
///
/// All multi-byte integers in the file format are big-endian.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    data: [u8; BLOCK_SIZE],
}

impl Block {
    /// Create a new zeroed block.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }

    /// Create a block from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { data: bytes }
    }

    /// Get the raw block data.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.data
    }

    /// Get mutable access to the raw block data.
    pub const fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.data
    }

    /// Read bytes at a specific offset.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Write bytes at a specific offset.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Read a u64 (big-endian) at the given offset.
    #[must_use]
    pub fn read_u64(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_be_bytes(buf)
    }

    /// Write a u64 (big-endian) at the given offset.
    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("first_24_bytes", &&self.data[..24])
            .finish_non_exhaustive()
    }
}

/// Byte range `[start, end)` of a block within the file, `None` if it
/// overflows u64.
#[must_use]
pub const fn block_range(block_id: BlockId) -> Option<(u64, u64)> {
    let Some(start) = block_id.checked_mul(BLOCK_SIZE_U64) else {
        return None;
    };
    let Some(end) = start.checked_add(BLOCK_SIZE_U64) else {
        return None;
    };
    Some((start, end))
}
