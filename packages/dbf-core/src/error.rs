//! DBF engine error types.

use std::io::ErrorKind;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DbfError>;

/// DBF file and key operation errors.
///
/// Caller bugs (`FieldType`, `FieldFormat`, `FieldNotFound`, `Schema`) are
/// kept apart from conditions a caller may retry after (`Lock`, `Io`).
#[derive(Error, Debug, Clone)]
pub enum DbfError {
    /// Open/read/write/flush/seek failure
    #[error("I/O error in {operation}: {message}")]
    Io {
        operation: &'static str,
        kind: ErrorKind,
        message: String,
    },

    /// Malformed or absent schema at construction
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Field name not present in the descriptor table
    #[error("{operation}: field '{field}' not found")]
    FieldNotFound {
        operation: &'static str,
        field: String,
    },

    /// Value type incompatible with the field's declared type
    #[error("{operation}: invalid field {field} (expected {expected}, field is {actual})")]
    FieldType {
        operation: &'static str,
        field: String,
        expected: char,
        actual: char,
    },

    /// Rendered value does not fit the field width exactly
    #[error("{operation}: invalid field {field} ({value:?} does not fit width {width})")]
    FieldFormat {
        operation: &'static str,
        field: String,
        value: String,
        width: usize,
    },

    /// Mutation attempted without the advisory lock
    #[error("{operation}: not locked")]
    Lock { operation: &'static str },

    /// Record buffer cannot be updated in the current state
    #[error("{operation}: can't update record ({reason})")]
    Update {
        operation: &'static str,
        reason: &'static str,
    },

    /// No addressable current record
    #[error("{operation}: record {record} is not addressable (last record {last})")]
    Position {
        operation: &'static str,
        record: u32,
        last: u32,
    },

    /// Keys of differing declared length compared
    #[error("key_compare: keys must have equal lengths ({left} != {right})")]
    LengthMismatch { left: usize, right: usize },

    /// Header or descriptor block of an existing file is invalid
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),
}

impl DbfError {
    /// Returns `true` for errors caused by caller misuse of the API rather
    /// than by the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DbfError::Schema(_)
                | DbfError::FieldNotFound { .. }
                | DbfError::FieldType { .. }
                | DbfError::FieldFormat { .. }
                | DbfError::LengthMismatch { .. }
        )
    }
}
