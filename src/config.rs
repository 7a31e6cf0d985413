//! Configuration for LayDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LayError, Result};

/// Default maximum key size (1 KiB)
pub const DEFAULT_MAX_KEY_SIZE: usize = 1024;

/// Default maximum value size (8 KiB)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 8 * 1024;

/// Main configuration for a LayDB store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the append-only log.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── laydb.aol        (append-only log)
    ///
    /// `None` keeps the store purely in memory (nothing is persisted).
    pub data_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// Largest key accepted by `set`/`delete` (bytes)
    pub max_key_size: usize,

    /// Largest value accepted by `set` (bytes)
    pub max_value_size: usize,

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------
    /// Period of the background compaction job, if any
    pub compaction_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Some(PathBuf::from("./laydb_data")),
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            compaction_interval: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config for a store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            ..Self::default()
        }
    }

    /// Whether commits are written to an append-only log
    pub fn is_persistent(&self) -> bool {
        self.data_dir.is_some()
    }

    /// Check the limits and intervals for values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_key_size == 0 {
            return Err(LayError::Config("max_key_size must be > 0".to_string()));
        }
        if self.max_value_size == 0 {
            return Err(LayError::Config("max_value_size must be > 0".to_string()));
        }
        if let Some(interval) = self.compaction_interval {
            if interval.is_zero() {
                return Err(LayError::Config(
                    "compaction_interval must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for the log file)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Keep the store in memory only
    pub fn in_memory(mut self) -> Self {
        self.config.data_dir = None;
        self
    }

    /// Set the maximum key size (in bytes)
    pub fn max_key_size(mut self, size: usize) -> Self {
        self.config.max_key_size = size;
        self
    }

    /// Set the maximum value size (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Run background compaction at this period
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_interval = Some(interval);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
