//! Field descriptor model: schema entries, resolved descriptors, layout.

mod field;
mod schema;
pub(crate) mod validation;

pub use field::{
    FieldDescriptor, FieldSpec, FieldType, DATETIME_FIELD_LEN, DATE_FIELD_LEN, FIELD_DESC_SIZE,
    MAX_FIELD_NAME_LEN,
};
pub use schema::{load_schema_json, SchemaFile};

use crate::error::{DbfError, Result};

/// Ordered, immutable descriptor table for one DBF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTable {
    fields: Vec<FieldDescriptor>,
    record_length: usize,
    header_length: usize,
}

impl FieldTable {
    /// Builds the descriptor table from a caller schema.
    ///
    /// Reading stops at the first entry with an empty name. Offsets are
    /// assigned cumulatively from 1 and names are upper-cased.
    ///
    /// # Errors
    /// `DbfError::Schema` if no fields precede the terminator or an entry
    /// is out of bounds for its type.
    pub fn build(schema: &[FieldSpec]) -> Result<Self> {
        let mut fields = Vec::new();
        let mut offset = 1usize;

        for spec in schema.iter().take_while(|s| !s.is_terminator()) {
            validation::validate_spec(spec)?;
            fields.push(FieldDescriptor {
                name: spec.name.to_ascii_uppercase(),
                field_type: spec.field_type,
                offset,
                length: spec.size,
                decimals: spec.decimals,
            });
            offset += spec.size;
        }

        if fields.is_empty() {
            return Err(DbfError::Schema("empty schema".to_string()));
        }
        validation::validate_unique_names(&fields)?;
        Self::from_layout(fields)
    }

    /// Rebuilds a table from descriptors decoded off disk.
    ///
    /// Stored offsets are ignored and recomputed. Only the layout is
    /// checked; widths and names other writers accept are kept as-is.
    pub(crate) fn from_decoded(mut fields: Vec<FieldDescriptor>) -> Result<Self> {
        if fields.is_empty() {
            return Err(DbfError::CorruptHeader("no field descriptors".to_string()));
        }
        let mut offset = 1usize;
        for field in &mut fields {
            if field.length == 0 {
                return Err(DbfError::CorruptHeader(format!(
                    "field '{}' has zero width",
                    field.name
                )));
            }
            field.offset = offset;
            offset += field.length;
        }
        Self::from_layout(fields).map_err(|e| DbfError::CorruptHeader(e.to_string()))
    }

    fn from_layout(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let record_length = validation::calculate_record_length(&fields)?;
        let header_length = validation::calculate_header_length(fields.len())?;
        validation::validate_field_layout(&fields, record_length)?;

        Ok(Self {
            fields,
            record_length,
            header_length,
        })
    }

    /// Record length in bytes, including the deletion flag.
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Header length in bytes: `32 + field_count * 32 + 2`.
    pub fn header_length(&self) -> usize {
        self.header_length
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn as_slice(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Finds a field by name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Finds a field by name or reports `FieldNotFound` for `operation`.
    pub(crate) fn lookup(&self, name: &str, operation: &'static str) -> Result<&FieldDescriptor> {
        self.find(name).ok_or_else(|| DbfError::FieldNotFound {
            operation,
            field: name.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
