//! Common helpers for end-to-end tests.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub use crate::testing::TestIndex;

/// `count` distinct keys in a seeded random order.
#[must_use]
pub fn shuffled_keys(seed: u64, count: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (1..=count).map(|k| k * 7).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

/// Write a text file into `dir` and return its path.
#[allow(clippy::expect_used)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write input file");
    path
}

/// Collect a full traversal of the index.
#[allow(clippy::expect_used)]
pub fn traverse_all(index: &mut TestIndex) -> Vec<(u64, u64)> {
    index
        .traverse()
        .expect("start traversal")
        .collect::<Result<_, _>>()
        .expect("traverse")
}

/// Assert that keys ascend strictly.
pub fn assert_strictly_ascending(entries: &[(u64, u64)]) {
    for pair in entries.windows(2) {
        assert!(
            pair[0].0 < pair[1].0,
            "keys out of order: {} then {}",
            pair[0].0,
            pair[1].0
        );
    }
}
