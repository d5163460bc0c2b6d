//! Field types, schema entries, and on-disk field descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{DbfError, Result};

/// Size of one encoded field descriptor in bytes.
pub const FIELD_DESC_SIZE: usize = 32;
/// Longest field name the descriptor slot can hold.
pub const MAX_FIELD_NAME_LEN: usize = 10;
/// Width of the fixed date encoding (`YYYYMMDD`).
pub const DATE_FIELD_LEN: usize = 8;
/// Width of the binary timestamp encoding (Julian day + milliseconds).
pub const DATETIME_FIELD_LEN: usize = 8;

/// Closed set of DBF field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// `C`: space-padded text
    Character,
    /// `N`: right-justified decimal text
    Numeric,
    /// `D`: `YYYYMMDD`
    Date,
    /// `L`: `T`/`F`, space when unset
    Logical,
    /// `M`: block reference into a memo file
    Memo,
    /// `T`: i32 LE Julian day then i32 LE milliseconds since midnight
    DateTime,
}

impl FieldType {
    /// Returns the one-byte tag stored in the descriptor.
    pub fn tag(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
            FieldType::Memo => b'M',
            FieldType::DateTime => b'T',
        }
    }

    /// Maps a descriptor tag back to a field type.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag.to_ascii_uppercase() {
            b'C' => Some(FieldType::Character),
            b'N' => Some(FieldType::Numeric),
            b'D' => Some(FieldType::Date),
            b'L' => Some(FieldType::Logical),
            b'M' => Some(FieldType::Memo),
            b'T' => Some(FieldType::DateTime),
            _ => None,
        }
    }

    /// Tag as a `char`, for messages.
    pub fn as_char(self) -> char {
        self.tag() as char
    }
}

/// One schema entry as supplied by the caller.
///
/// An entry with an empty name terminates a schema sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name (case-insensitive, stored upper-cased)
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Width in bytes
    pub size: usize,
    /// Digits after the decimal point (numeric only)
    #[serde(default)]
    pub decimals: usize,
}

impl FieldSpec {
    /// Creates a schema entry.
    pub fn new(name: impl Into<String>, field_type: FieldType, size: usize, decimals: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            size,
            decimals,
        }
    }

    pub fn character(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, FieldType::Character, size, 0)
    }

    pub fn numeric(name: impl Into<String>, size: usize, decimals: usize) -> Self {
        Self::new(name, FieldType::Numeric, size, decimals)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date, DATE_FIELD_LEN, 0)
    }

    pub fn logical(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Logical, 1, 0)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime, DATETIME_FIELD_LEN, 0)
    }

    /// Returns `true` if this entry marks the end of a schema.
    pub fn is_terminator(&self) -> bool {
        self.name.is_empty()
    }
}

/// Field definition within a record, with its resolved byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Upper-cased field name
    pub name: String,
    /// Field type
    pub field_type: FieldType,
    /// Byte offset within the record (1-based; byte 0 is the deletion flag)
    pub offset: usize,
    /// Width in bytes
    pub length: usize,
    /// Digits after the decimal point
    pub decimals: usize,
}

impl FieldDescriptor {
    /// Returns the end offset of this field (offset + length).
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    /// Encodes the 32-byte on-disk descriptor.
    ///
    /// Layout: name `[0..11]` NUL-padded, type `[11]`, offset `[12..16]` LE,
    /// length `[16]`, decimals `[17]`, reserved zeros. A `C` field stores
    /// its width as u16 LE across `[16..18]`.
    pub fn encode(&self) -> [u8; FIELD_DESC_SIZE] {
        let mut out = [0u8; FIELD_DESC_SIZE];
        let name = self.name.as_bytes();
        let n = name.len().min(MAX_FIELD_NAME_LEN);
        out[..n].copy_from_slice(&name[..n]);
        out[11] = self.field_type.tag();
        out[12..16].copy_from_slice(&(self.offset as u32).to_le_bytes());
        if self.field_type == FieldType::Character {
            // Clipper keeps the high byte of wide text fields in the decimals slot.
            out[16..18].copy_from_slice(&(self.length as u16).to_le_bytes());
        } else {
            out[16] = self.length as u8;
            out[17] = self.decimals as u8;
        }
        out
    }

    /// Decodes an on-disk descriptor.
    ///
    /// The stored offset is returned as-is; callers recompute offsets since
    /// other writers use that slot for in-memory addresses.
    pub fn decode(bytes: &[u8; FIELD_DESC_SIZE]) -> Result<Self> {
        let name_end = bytes[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = std::str::from_utf8(&bytes[..name_end])
            .map_err(|_| DbfError::CorruptHeader("field name is not valid text".to_string()))?
            .trim_end()
            .to_ascii_uppercase();
        if name.is_empty() {
            return Err(DbfError::CorruptHeader("empty field name".to_string()));
        }
        let field_type = FieldType::from_tag(bytes[11]).ok_or_else(|| {
            DbfError::CorruptHeader(format!(
                "field '{}' has unknown type tag 0x{:02X}",
                name, bytes[11]
            ))
        })?;
        let offset = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        let (length, decimals) = match field_type {
            FieldType::Character => (u16::from_le_bytes([bytes[16], bytes[17]]) as usize, 0),
            _ => (bytes[16] as usize, bytes[17] as usize),
        };

        Ok(Self {
            name,
            field_type,
            offset,
            length,
            decimals,
        })
    }
}
