//! Index file I/O operations.
//!
//! This module owns the open file handle and handles reading and writing
//! blocks and the header. Nothing here knows about tree structure.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::storage::block::{
    BLOCK_SIZE, BLOCK_SIZE_U64, Block, BlockId, HEADER_BLOCK, MAX_BLOCKS, block_range,
};
use crate::storage::codec::CodecError;
use crate::storage::header::Header;

/// An index file handle with low-level block I/O operations.
///
/// The file is closed when the store is dropped.
pub struct BlockStore {
    file: File,
    path: PathBuf,
    header: Header,
    /// Current file length in bytes, tracked to bounds-check reads.
    file_len: u64,
}

impl BlockStore {
    /// Create a new index file at the given path.
    ///
    /// Returns `AlreadyExists` if the file exists and `overwrite` is false;
    /// otherwise the file is truncated and a fresh header is written.
    pub fn create(path: &Path, overwrite: bool) -> Result<Self, StoreError> {
        if path.exists() && !overwrite {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(StoreError::Io)?;

        let header = Header::new();
        file.write_all(header.to_block().as_bytes())
            .map_err(StoreError::Io)?;
        file.sync_all().map_err(StoreError::Io)?;

        tracing::info!(path = %path.display(), "created index file");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            file_len: BLOCK_SIZE_U64,
        })
    }

    /// Open an existing index file.
    ///
    /// Returns `NotFound` if the file is absent and `Format` if the header
    /// block is short, carries the wrong magic, or is inconsistent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let file_len = file.metadata().map_err(StoreError::Io)?.len();

        let mut buf = Vec::with_capacity(BLOCK_SIZE);
        (&mut file)
            .take(BLOCK_SIZE_U64)
            .read_to_end(&mut buf)
            .map_err(StoreError::Io)?;

        let header = Header::from_bytes(&buf)?;
        header.validate()?;

        tracing::info!(
            path = %path.display(),
            root_block = header.root_block,
            next_block = header.next_block,
            "opened index file"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            file_len,
        })
    }

    /// Path of the open file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory copy of the header, identical to what is on disk.
    #[must_use]
    pub const fn header(&self) -> Header {
        self.header
    }

    /// Root block number, 0 for an empty tree.
    #[must_use]
    pub const fn root(&self) -> BlockId {
        self.header.root_block
    }

    /// Next block number that will be allocated.
    #[must_use]
    pub const fn next_block(&self) -> BlockId {
        self.header.next_block
    }

    /// Number of whole blocks currently in the file.
    #[must_use]
    pub const fn total_blocks(&self) -> u64 {
        self.file_len / BLOCK_SIZE_U64
    }

    /// Point the header at a new root and persist it.
    pub fn set_root(&mut self, root_block: BlockId) -> Result<(), StoreError> {
        self.header.root_block = root_block;
        self.flush_header()
    }

    /// Hand out the next block number.
    ///
    /// The header is persisted before returning, so a crash afterwards can
    /// only waste the number, never reuse it. Fails once the file has run
    /// out of addressable blocks.
    pub fn allocate_block(&mut self) -> Result<BlockId, StoreError> {
        let block_id = self.header.next_block;
        if block_id >= MAX_BLOCKS {
            return Err(StoreError::BlockOutOfRange {
                block_id,
                total_blocks: self.total_blocks(),
            });
        }
        self.header.next_block = block_id + 1;
        self.flush_header()?;

        tracing::debug!(block_id, "allocated block");

        Ok(block_id)
    }

    /// Read a block from the file.
    ///
    /// Returns an error if the block does not lie entirely within the file.
    pub fn read_block(&mut self, block_id: BlockId) -> Result<Block, StoreError> {
        let offset = match block_range(block_id) {
            Some((start, end)) if end <= self.file_len => start,
            _ => {
                return Err(StoreError::BlockOutOfRange {
                    block_id,
                    total_blocks: self.total_blocks(),
                });
            }
        };

        let mut block = Block::new();
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(StoreError::Io)?;
        self.file
            .read_exact(block.as_bytes_mut())
            .map_err(StoreError::Io)?;

        Ok(block)
    }

    /// Write a node block to the file.
    ///
    /// Writing past the current end extends the file. Block 0 and blocks that
    /// have not been allocated yet are refused.
    pub fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<(), StoreError> {
        if block_id == HEADER_BLOCK || block_id >= self.header.next_block {
            return Err(StoreError::BlockOutOfRange {
                block_id,
                total_blocks: self.total_blocks(),
            });
        }
        let Some((offset, end)) = block_range(block_id) else {
            return Err(StoreError::BlockOutOfRange {
                block_id,
                total_blocks: self.total_blocks(),
            });
        };

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(StoreError::Io)?;
        self.file
            .write_all(block.as_bytes())
            .map_err(StoreError::Io)?;

        self.file_len = self.file_len.max(end);
        Ok(())
    }

    /// Write the header to block 0.
    pub fn flush_header(&mut self) -> Result<(), StoreError> {
        self.file.seek(SeekFrom::Start(0)).map_err(StoreError::Io)?;
        self.file
            .write_all(self.header.to_block().as_bytes())
            .map_err(StoreError::Io)?;
        Ok(())
    }

    /// Sync all pending writes to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.file.sync_all().map_err(StoreError::Io)
    }
}

/// Errors that can occur during file operations.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error.
    Io(std::io::Error),
    /// File does not exist.
    NotFound(PathBuf),
    /// File already exists and overwrite was not confirmed.
    AlreadyExists(PathBuf),
    /// Header block is malformed.
    Format(CodecError),
    /// Block number outside the file.
    BlockOutOfRange { block_id: BlockId, total_blocks: u64 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotFound(p) => write!(f, "file does not exist: {}", p.display()),
            Self::AlreadyExists(p) => write!(f, "file already exists: {}", p.display()),
            Self::Format(e) => write!(f, "invalid file format: {e}"),
            Self::BlockOutOfRange {
                block_id,
                total_blocks,
            } => {
                write!(
                    f,
                    "block {block_id} out of range (total blocks: {total_blocks})"
                )
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::NotFound(_) | Self::AlreadyExists(_) | Self::BlockOutOfRange { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        Self::Format(e)
    }
}
