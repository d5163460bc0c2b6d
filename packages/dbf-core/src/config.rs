//! DBF engine configuration.

use serde::Deserialize;

use crate::error::{DbfError, Result};

/// Start of the conventional lock window, past any realistic data region.
pub const DEFAULT_LOCK_OFFSET: u64 = 1_000_000_001;
/// Length of the conventional lock window.
pub const DEFAULT_LOCK_LENGTH: u64 = 1_000_000_000;

/// DBF engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbfConfig {
    /// First byte of the advisory lock window
    pub lock_offset: u64,
    /// Length of the advisory lock window in bytes
    pub lock_length: u64,
    /// Sync file data to disk on every flush
    pub sync_writes: bool,
    /// Caller guarantees exclusive access; the lock is treated as held
    pub exclusive: bool,
    /// Open existing files without write access
    pub read_only: bool,
}

impl Default for DbfConfig {
    fn default() -> Self {
        Self {
            lock_offset: DEFAULT_LOCK_OFFSET,
            lock_length: DEFAULT_LOCK_LENGTH,
            sync_writes: true,
            exclusive: false,
            read_only: false,
        }
    }
}

impl DbfConfig {
    /// Parses a configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DbfError::Config(format!("Failed to parse config: {}", e)))
    }
}
