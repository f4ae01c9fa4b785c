//! Index configuration.
//!
//! Loaded from environment variables; every setting has a default.
//!
//! # Environment Variables
//!
//! - `BTINDEX_CACHE_CAPACITY`: clean nodes kept in memory between operations
//!   (default: `64`)
//! - `BTINDEX_SYNC_WRITES`: fsync after every mutating operation, one of
//!   `true`, `false`, `1`, `0` (default: `true`)

use crate::storage::DEFAULT_CACHE_CAPACITY;

/// Settings for an open index session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Clean nodes retained by the node cache between operations.
    pub cache_capacity: usize,
    /// Whether every insert is followed by an fsync.
    pub sync_writes: bool,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            sync_writes: true,
        }
    }
}

impl IndexConfig {
    /// Environment variable for the cache capacity.
    pub const CACHE_CAPACITY_VAR: &'static str = "BTINDEX_CACHE_CAPACITY";
    /// Environment variable for the sync policy.
    pub const SYNC_WRITES_VAR: &'static str = "BTINDEX_SYNC_WRITES";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_capacity = match lookup(Self::CACHE_CAPACITY_VAR) {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: Self::CACHE_CAPACITY_VAR.to_string(),
                    message: format!("'{value}' is not a non-negative integer"),
                })?,
            None => defaults.cache_capacity,
        };

        let sync_writes = match lookup(Self::SYNC_WRITES_VAR) {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: Self::SYNC_WRITES_VAR.to_string(),
                message: format!("'{value}' is not one of true, false, 1, 0"),
            })?,
            None => defaults.sync_writes,
        };

        Ok(Self {
            cache_capacity,
            sync_writes,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
