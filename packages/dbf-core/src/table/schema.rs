//! JSON schema documents for DBF field definitions.

use serde::{Deserialize, Serialize};

use super::field::FieldSpec;
use crate::error::{DbfError, Result};

/// Current schema document version.
pub const SCHEMA_VERSION: u32 = 1;

/// Schema document format.
#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaFile {
    /// Schema version
    pub version: u32,
    /// Field definitions in record order
    pub fields: Vec<FieldSpec>,
}

/// Parses a JSON schema document into field specs.
///
/// # Errors
/// `DbfError::Schema` if the document does not parse or has an unsupported
/// version. Field bounds are checked later by `FieldTable::build`.
pub fn load_schema_json(json: &str) -> Result<Vec<FieldSpec>> {
    let schema: SchemaFile = serde_json::from_str(json)
        .map_err(|e| DbfError::Schema(format!("Failed to parse schema: {}", e)))?;

    if schema.version != SCHEMA_VERSION {
        return Err(DbfError::Schema(format!(
            "Unsupported schema version: {}",
            schema.version
        )));
    }

    Ok(schema.fields)
}
