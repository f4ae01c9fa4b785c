//! End-to-end tests at the index session level.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! to exercise the complete path from `Index` down to the file on disk.

#![cfg(test)]

mod helpers;

mod test_duplicate_insert;
mod test_extract_load_roundtrip;
mod test_load_duplicates;
mod test_open_bad_magic;
mod test_persistence;
mod test_random_inserts;
mod test_root_split;
