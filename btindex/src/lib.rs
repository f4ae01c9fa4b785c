// Life of an operation:
// 1. The shell (or a library caller) holds an `Index` session
// 2. The session lends its block store and node cache to a `BTree`
// 3. The tree reads nodes through the cache, falling back to the store
// 4. Mutations collect as dirty nodes and are flushed before returning;
//    a new root reaches the header last
//
// System components:
//  - Block codec and block store (storage)
//  - Node cache
//  - B-tree engine
//  - Text import/export and the interactive shell

pub mod cli;
pub mod config;
pub mod index;
pub mod storage;
pub mod transfer;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, IndexConfig};
pub use index::{Index, IndexError, LoadReport};
