//! Plain-text import and export of `key,value` pairs.
//!
//! One pair per line. Each side is trimmed and parsed as an unsigned 64-bit
//! integer; blank lines are ignored.

use std::io::{BufRead, Write};

/// Parse one input line.
///
/// Returns `Ok(None)` for a blank line.
pub fn parse_line(line_number: usize, line: &str) -> Result<Option<(u64, u64)>, TransferError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let malformed = || TransferError::Malformed {
        line_number,
        content: line.trim_end().to_string(),
    };

    let (key, value) = line.split_once(',').ok_or_else(malformed)?;
    let key = key.trim().parse::<u64>().map_err(|_| malformed())?;
    let value = value.trim().parse::<u64>().map_err(|_| malformed())?;
    Ok(Some((key, value)))
}

/// Iterator over the pairs of a text source.
///
/// Yields `Malformed` for lines that do not parse, including lines that are
/// not valid UTF-8, and keeps going; an I/O error ends the iteration.
pub struct PairReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    failed: bool,
}

/// Read pairs from a buffered source.
pub fn read_pairs<R: BufRead>(reader: R) -> PairReader<R> {
    PairReader {
        reader,
        buf: Vec::new(),
        line_number: 0,
        failed: false,
    }
}

impl<R: BufRead> PairReader<R> {
    /// Parse the line currently held in `buf`.
    fn parse_buffered(&self) -> Result<Option<(u64, u64)>, TransferError> {
        let raw = self.buf.strip_suffix(b"\n").unwrap_or(self.buf.as_slice());
        match std::str::from_utf8(raw) {
            Ok(line) => parse_line(self.line_number, line),
            Err(_) => Err(TransferError::Malformed {
                line_number: self.line_number,
                content: String::from_utf8_lossy(raw).trim_end().to_string(),
            }),
        }
    }
}

impl<R: BufRead> Iterator for PairReader<R> {
    type Item = Result<(u64, u64), TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(TransferError::Io(e)));
                }
            }
            self.line_number += 1;
            match self.parse_buffered() {
                Ok(None) => {}
                Ok(Some(pair)) => return Some(Ok(pair)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Write one pair as a `key,value` line.
pub fn write_pair<W: Write>(writer: &mut W, key: u64, value: u64) -> Result<(), TransferError> {
    writeln!(writer, "{key},{value}").map_err(TransferError::Io)
}

/// Errors from reading or writing pair files.
#[derive(Debug)]
pub enum TransferError {
    /// I/O error.
    Io(std::io::Error),
    /// A line is not a `key,value` pair of unsigned integers.
    Malformed { line_number: usize, content: String },
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed {
                line_number,
                content,
            } => write!(f, "invalid line {line_number}: '{content}'"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
