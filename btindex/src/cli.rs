//! Interactive command loop.
//!
//! Reads commands and their arguments line by line and prints results. Engine
//! errors are reported and the loop keeps going; only I/O errors on the
//! terminal itself end it.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::IndexConfig;
use crate::index::{Index, IndexError};
use crate::storage::StoreError;

const COMMANDS: &str = "Commands: create, open, insert, search, load, print, extract, verify, quit";

/// Command loop over an input and an output stream.
pub struct Shell<R, W> {
    input: R,
    output: W,
    config: IndexConfig,
    index: Option<Index>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// Create a shell with no index open.
    pub const fn new(input: R, output: W, config: IndexConfig) -> Self {
        Self {
            input,
            output,
            config,
            index: None,
        }
    }

    /// Run until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "\n{COMMANDS}")?;
            let Some(command) = self.prompt("Enter a command: ")? else {
                break;
            };

            match command.to_ascii_lowercase().as_str() {
                "create" => self.create()?,
                "open" => self.open()?,
                "insert" => self.insert()?,
                "search" => self.search()?,
                "load" => self.load()?,
                "print" => self.print()?,
                "extract" => self.extract()?,
                "verify" => self.verify()?,
                "quit" => {
                    writeln!(self.output, "Exiting program.")?;
                    break;
                }
                _ => writeln!(self.output, "Invalid command. Try again.")?,
            }
        }

        self.close_current();
        Ok(())
    }

    /// Print a prompt and read one trimmed line; `None` at end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm_overwrite(&mut self, name: &str) -> io::Result<bool> {
        let answer = self.prompt(&format!("File {name} exists. Overwrite? (yes/no): "))?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("yes")))
    }

    fn prompt_u64(&mut self, message: &str) -> io::Result<Option<u64>> {
        let value = self.prompt(message)?.and_then(|s| s.parse::<u64>().ok());
        if value.is_none() {
            writeln!(self.output, "Error: Invalid input.")?;
        }
        Ok(value)
    }

    fn close_current(&mut self) {
        let Some(index) = self.index.take() else {
            return;
        };
        if let Err(e) = index.close() {
            tracing::warn!(error = %e, "failed to close index");
        }
    }

    fn create(&mut self) -> io::Result<()> {
        let Some(name) = self.prompt("Enter file name: ")? else {
            return Ok(());
        };
        let path = Path::new(&name);
        let overwrite = path.exists();
        if overwrite && !self.confirm_overwrite(&name)? {
            return writeln!(self.output, "Operation canceled.");
        }

        match Index::create(path, overwrite, self.config) {
            Ok(index) => {
                self.close_current();
                self.index = Some(index);
                writeln!(self.output, "File {name} created and opened.")
            }
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn open(&mut self) -> io::Result<()> {
        let Some(name) = self.prompt("Enter file name: ")? else {
            return Ok(());
        };

        match Index::open(Path::new(&name), self.config) {
            Ok(index) => {
                self.close_current();
                self.index = Some(index);
                writeln!(self.output, "File {name} opened.")
            }
            Err(IndexError::Store(StoreError::NotFound(_))) => {
                writeln!(self.output, "Error: File {name} does not exist.")
            }
            Err(IndexError::Store(StoreError::Format(e))) => {
                writeln!(self.output, "Error: Invalid file format. ({e})")
            }
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn insert(&mut self) -> io::Result<()> {
        if self.index.is_none() {
            return writeln!(self.output, "Error: No file is open.");
        }
        let Some(key) = self.prompt_u64("Enter key: ")? else {
            return Ok(());
        };
        let Some(value) = self.prompt_u64("Enter value: ")? else {
            return Ok(());
        };

        let Some(index) = self.index.as_mut() else {
            return Ok(());
        };
        match index.insert(key, value) {
            Ok(()) => writeln!(self.output, "Key-value pair inserted."),
            Err(e) if e.is_duplicate_key() => writeln!(self.output, "Error: Key already exists."),
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn search(&mut self) -> io::Result<()> {
        if self.index.is_none() {
            return writeln!(self.output, "Error: No file is open.");
        }
        let Some(key) = self.prompt_u64("Enter key: ")? else {
            return Ok(());
        };

        let Some(index) = self.index.as_mut() else {
            return Ok(());
        };
        match index.search(key) {
            Ok(Some(value)) => writeln!(self.output, "Key: {key}, Value: {value}"),
            Ok(None) => writeln!(self.output, "Error: Key not found."),
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn load(&mut self) -> io::Result<()> {
        if self.index.is_none() {
            return writeln!(self.output, "Error: No file is open.");
        }
        let Some(name) = self.prompt("Enter file name: ")? else {
            return Ok(());
        };

        let Some(index) = self.index.as_mut() else {
            return Ok(());
        };
        match index.load(Path::new(&name)) {
            Ok(report) => {
                for line_number in &report.malformed_lines {
                    writeln!(self.output, "Error: Invalid line {line_number}. Skipping.")?;
                }
                for key in &report.skipped_duplicates {
                    writeln!(self.output, "Warning: Key {key} already exists. Skipping.")?;
                }
                writeln!(self.output, "Loaded {} key-value pairs.", report.inserted)
            }
            Err(IndexError::NotFound(_)) => {
                writeln!(self.output, "Error: File {name} does not exist.")
            }
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn print(&mut self) -> io::Result<()> {
        let Some(index) = self.index.as_mut() else {
            return writeln!(self.output, "Error: No file is open.");
        };
        match index.print_all() {
            Ok(entries) => {
                for (key, value) in entries {
                    writeln!(self.output, "Key: {key}, Value: {value}")?;
                }
                Ok(())
            }
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn extract(&mut self) -> io::Result<()> {
        if self.index.is_none() {
            return writeln!(self.output, "Error: No file is open.");
        }
        let Some(name) = self.prompt("Enter file name to save: ")? else {
            return Ok(());
        };
        let path = Path::new(&name);
        let overwrite = path.exists();
        if overwrite && !self.confirm_overwrite(&name)? {
            return writeln!(self.output, "Operation canceled.");
        }

        let Some(index) = self.index.as_mut() else {
            return Ok(());
        };
        match index.extract(path, overwrite) {
            Ok(_) => writeln!(self.output, "Index saved to {name}."),
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }

    fn verify(&mut self) -> io::Result<()> {
        let Some(index) = self.index.as_mut() else {
            return writeln!(self.output, "Error: No file is open.");
        };
        match index.verify() {
            Ok(stats) => writeln!(
                self.output,
                "Tree OK: height {}, {} nodes, {} entries.",
                stats.height, stats.node_count, stats.entry_count
            ),
            Err(e) => writeln!(self.output, "Error: {e}"),
        }
    }
}
