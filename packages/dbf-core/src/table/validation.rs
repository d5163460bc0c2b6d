//! Validation methods for schema entries and field layout.

use std::collections::HashSet;

use super::field::{
    FieldDescriptor, FieldSpec, FieldType, DATETIME_FIELD_LEN, DATE_FIELD_LEN, MAX_FIELD_NAME_LEN,
};
use crate::error::{DbfError, Result};

/// Largest width a one-byte descriptor length can express.
pub(crate) const MAX_FIELD_LEN: usize = 255;

/// Validates a single schema entry before it becomes a descriptor.
pub(crate) fn validate_spec(spec: &FieldSpec) -> Result<()> {
    let name = &spec.name;
    if name.len() > MAX_FIELD_NAME_LEN {
        return Err(DbfError::Schema(format!(
            "Field name '{}' longer than {} characters",
            name, MAX_FIELD_NAME_LEN
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(DbfError::Schema(format!(
            "Field name '{}' must be ASCII letters, digits or '_'",
            name
        )));
    }
    validate_width(name, spec.field_type, spec.size, spec.decimals)
}

/// Checks size and decimals against the rules of the field type.
pub(crate) fn validate_width(
    name: &str,
    field_type: FieldType,
    size: usize,
    decimals: usize,
) -> Result<()> {
    if size == 0 || size > MAX_FIELD_LEN {
        return Err(DbfError::Schema(format!(
            "Field '{}' size {} outside 1..={}",
            name, size, MAX_FIELD_LEN
        )));
    }

    match field_type {
        FieldType::Date if size != DATE_FIELD_LEN => {
            return Err(DbfError::Schema(format!(
                "Date field '{}' must be {} bytes, got {}",
                name, DATE_FIELD_LEN, size
            )));
        }
        FieldType::DateTime if size != DATETIME_FIELD_LEN => {
            return Err(DbfError::Schema(format!(
                "DateTime field '{}' must be {} bytes, got {}",
                name, DATETIME_FIELD_LEN, size
            )));
        }
        FieldType::Logical if size != 1 => {
            return Err(DbfError::Schema(format!(
                "Logical field '{}' must be 1 byte, got {}",
                name, size
            )));
        }
        _ => {}
    }

    if decimals > 0 {
        if field_type != FieldType::Numeric {
            return Err(DbfError::Schema(format!(
                "Field '{}' of type {} cannot have decimals",
                name,
                field_type.as_char()
            )));
        }
        // Room for at least the point and one leading digit.
        if decimals + 2 > size {
            return Err(DbfError::Schema(format!(
                "Numeric field '{}' width {} too small for {} decimals",
                name, size, decimals
            )));
        }
    }
    Ok(())
}

/// Rejects duplicate names, compared case-insensitively.
pub(crate) fn validate_unique_names(fields: &[FieldDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.to_ascii_uppercase()) {
            return Err(DbfError::Schema(format!(
                "Field '{}' defined more than once",
                field.name
            )));
        }
    }
    Ok(())
}

/// Calculates the record length: all field widths plus the deletion flag.
pub(crate) fn calculate_record_length(fields: &[FieldDescriptor]) -> Result<usize> {
    let data = fields.iter().try_fold(0usize, |acc, f| {
        acc.checked_add(f.length)
            .ok_or_else(|| DbfError::Schema("record length overflow".to_string()))
    })?;
    let record_length = data + 1;
    if record_length > u16::MAX as usize {
        return Err(DbfError::Schema(format!(
            "Record length {} exceeds {}",
            record_length,
            u16::MAX
        )));
    }
    Ok(record_length)
}

/// Calculates the header length: header, descriptors and the terminator.
pub(crate) fn calculate_header_length(field_count: usize) -> Result<usize> {
    let length = field_count
        .checked_mul(32)
        .and_then(|n| n.checked_add(32 + 2))
        .ok_or_else(|| DbfError::Schema("header length overflow".to_string()))?;
    if length > u16::MAX as usize {
        return Err(DbfError::Schema(format!(
            "{} fields exceed the maximum header length",
            field_count
        )));
    }
    Ok(length)
}

/// Verifies offsets are contiguous from 1 and every field fits the record.
pub(crate) fn validate_field_layout(fields: &[FieldDescriptor], record_length: usize) -> Result<()> {
    let mut expected = 1usize;
    for field in fields {
        if field.offset != expected {
            return Err(DbfError::Schema(format!(
                "Field '{}' offset {} breaks contiguous layout (expected {})",
                field.name, field.offset, expected
            )));
        }
        if field.end_offset() > record_length {
            return Err(DbfError::Schema(format!(
                "Field '{}' (offset={}, length={}) exceeds record length {}",
                field.name, field.offset, field.length, record_length
            )));
        }
        expected = field.end_offset();
    }
    Ok(())
}
