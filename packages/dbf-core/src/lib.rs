//! dBASE DBF table writer and NTX key primitives.
//!
//! Provides the header and field descriptor layout, a single-record
//! scratch buffer with typed field inserts, append/commit/status writes
//! gated by a cross-process advisory lock, and the fixed-length key value
//! an NTX index orders its entries by.

pub mod config;
pub mod date;
pub mod error;
pub mod file;
pub mod header;
pub mod io_utils;
pub mod lock;
pub mod ntx;
pub mod record;
pub mod table;

pub use config::DbfConfig;
pub use error::{DbfError, Result};
pub use file::{DbfFile, FileLockGuard};
pub use ntx::{KeyCompare, KeyValue, NTX_MAX_KEY_LENGTH};
pub use table::{FieldSpec, FieldType};
