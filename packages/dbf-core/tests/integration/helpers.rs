//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;

use dbf_core::{DbfFile, FieldSpec};

/// `NAME C(10)`, `AGE N(3,0)`: 14-byte records, 98-byte header.
pub fn people_schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec::character("name", 10),
        FieldSpec::numeric("age", 3, 0),
    ]
}

/// Appends and commits one person; the caller holds the lock.
pub fn add_person(dbf: &mut DbfFile, name: &str, age: i64) -> dbf_core::Result<()> {
    dbf.append()?;
    dbf.insert_str("NAME", name)?;
    dbf.insert_int("AGE", age)?;
    dbf.commit()
}

/// Persisted record count at header offset 4.
pub fn persisted_count(path: &Path) -> i32 {
    let bytes = fs::read(path).unwrap();
    i32::from_le_bytes(bytes[4..8].try_into().unwrap())
}

/// Raw bytes of 1-based `record`.
pub fn record_at(path: &Path, header_len: usize, rec_len: usize, record: usize) -> Vec<u8> {
    let bytes = fs::read(path).unwrap();
    let start = header_len + (record - 1) * rec_len;
    bytes[start..start + rec_len].to_vec()
}
