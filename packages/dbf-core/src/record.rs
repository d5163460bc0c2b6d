//! Single-record scratch buffer.
//!
//! Holds `rec_len + 1` bytes: byte 0 is the deletion flag, fields follow at
//! their descriptor offsets, and the trailing NUL is never written to disk.
//! Every setter validates before touching the bytes, so a failed insert
//! leaves the buffer as it was.

use chrono::{NaiveDate, NaiveDateTime};

use crate::date;
use crate::error::{DbfError, Result};
use crate::header::{RECORD_ACTIVE, RECORD_DELETED};
use crate::table::{FieldDescriptor, FieldType};

const INSERT: &str = "insert()";

/// The record currently being built or inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBuffer {
    bytes: Vec<u8>,
}

impl RecordBuffer {
    /// Allocates a blank buffer for records of `rec_len` bytes.
    pub fn new(rec_len: usize) -> Self {
        let mut buffer = Self {
            bytes: vec![b' '; rec_len + 1],
        };
        buffer.reset();
        buffer
    }

    /// Fills the record with spaces and restores the terminator.
    pub fn reset(&mut self) {
        let rec_len = self.rec_len();
        self.bytes[..rec_len].fill(b' ');
        self.bytes[rec_len] = 0;
    }

    /// Record length, excluding the terminator.
    pub fn rec_len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// The bytes written to disk for this record.
    pub fn as_record(&self) -> &[u8] {
        &self.bytes[..self.rec_len()]
    }

    /// The whole buffer, terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrites the record bytes with data read from disk.
    pub(crate) fn load(&mut self, record: &[u8]) {
        let rec_len = self.rec_len();
        self.bytes[..rec_len].copy_from_slice(&record[..rec_len]);
        self.bytes[rec_len] = 0;
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    pub fn is_deleted(&self) -> bool {
        self.bytes[0] == RECORD_DELETED
    }

    pub(crate) fn set_deleted(&mut self, remove: bool) {
        self.bytes[0] = if remove { RECORD_DELETED } else { RECORD_ACTIVE };
    }

    /// Raw bytes of `field`.
    pub fn field(&self, field: &FieldDescriptor) -> &[u8] {
        &self.bytes[field.offset..field.end_offset()]
    }

    fn field_mut(&mut self, field: &FieldDescriptor) -> &mut [u8] {
        &mut self.bytes[field.offset..field.end_offset()]
    }

    /// Writes a date as `YYYYMMDD` into a `D` field.
    pub fn put_date(&mut self, field: &FieldDescriptor, value: NaiveDate) -> Result<()> {
        expect_type(field, FieldType::Date)?;
        let text = date::to_dbf_text(value)
            .filter(|text| text.len() == field.length)
            .ok_or_else(|| format_error(field, value.to_string()))?;
        self.field_mut(field).copy_from_slice(&text);
        Ok(())
    }

    /// Writes a timestamp into a binary `T` field.
    pub fn put_datetime(&mut self, field: &FieldDescriptor, value: NaiveDateTime) -> Result<()> {
        expect_type(field, FieldType::DateTime)?;
        let bytes = date::to_julian_bytes(value)
            .filter(|bytes| bytes.len() == field.length)
            .ok_or_else(|| format_error(field, value.to_string()))?;
        self.field_mut(field).copy_from_slice(&bytes);
        Ok(())
    }

    /// Writes an integer right-justified into an `N` field.
    ///
    /// The rendering must fill the field width exactly.
    pub fn put_int(&mut self, field: &FieldDescriptor, value: i64) -> Result<()> {
        let text = format!("{:>width$}", value, width = field.length);
        self.put_numeric_text(field, text)
    }

    /// Writes a float with `field.decimals` fraction digits into an `N` field.
    pub fn put_float(&mut self, field: &FieldDescriptor, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(format_error(field, value.to_string()));
        }
        let text = format!(
            "{:>width$.prec$}",
            value,
            width = field.length,
            prec = field.decimals
        );
        self.put_numeric_text(field, text)
    }

    fn put_numeric_text(&mut self, field: &FieldDescriptor, text: String) -> Result<()> {
        if field.field_type != FieldType::Numeric || text.len() != field.length {
            return Err(format_error(field, text));
        }
        self.field_mut(field).copy_from_slice(text.as_bytes());
        Ok(())
    }

    /// Copies at most `field.length` bytes of `value`, padding with spaces.
    ///
    /// Copying stops at an embedded NUL; longer input is truncated.
    pub fn put_str(&mut self, field: &FieldDescriptor, value: &str) -> Result<()> {
        let src = value.as_bytes();
        let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
        let src = &src[..end];

        let dst = self.field_mut(field);
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        dst[n..].fill(b' ');
        Ok(())
    }

    /// Writes `T` or `F` into an `L` field.
    pub fn put_bool(&mut self, field: &FieldDescriptor, value: bool) -> Result<()> {
        expect_type(field, FieldType::Logical)?;
        let flag = if value { b'T' } else { b'F' };
        let dst = self.field_mut(field);
        dst[0] = flag;
        dst[1..].fill(b' ');
        Ok(())
    }
}

fn expect_type(field: &FieldDescriptor, expected: FieldType) -> Result<()> {
    if field.field_type != expected {
        return Err(DbfError::FieldType {
            operation: INSERT,
            field: field.name.clone(),
            expected: expected.as_char(),
            actual: field.field_type.as_char(),
        });
    }
    Ok(())
}

fn format_error(field: &FieldDescriptor, text: String) -> DbfError {
    DbfError::FieldFormat {
        operation: INSERT,
        field: field.name.clone(),
        value: text,
        width: field.length,
    }
}
