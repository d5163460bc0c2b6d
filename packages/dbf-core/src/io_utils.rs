//! I/O utilities for positioned file access.

use std::fs::File;
use std::io::ErrorKind;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

use crate::error::DbfError;

/// Converts an I/O error into `DbfError::Io`, tagged with the failing operation.
///
/// Nothing is retried: a partially written fixed-offset record is surfaced
/// to the caller as-is.
pub fn classify_io_error(error: std::io::Error, operation: &'static str) -> DbfError {
    let message = match error.kind() {
        ErrorKind::StorageFull => format!("disk full: {}", error),
        ErrorKind::UnexpectedEof => format!("unexpected end of file: {}", error),
        _ => error.to_string(),
    };
    DbfError::Io {
        operation,
        kind: error.kind(),
        message,
    }
}

/// Writes all of `data` at byte `offset` without relying on the file cursor.
#[cfg(unix)]
pub fn write_all_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<()> {
    file.write_all_at(data, offset)
}

#[cfg(windows)]
pub fn write_all_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<()> {
    let mut pos = 0;
    while pos < data.len() {
        let n = file.seek_write(&data[pos..], offset + pos as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                ErrorKind::WriteZero,
                "failed to write whole buffer",
            ));
        }
        pos += n;
    }
    Ok(())
}

/// Reads exactly `buf.len()` bytes from byte `offset`.
#[cfg(unix)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    let mut pos = 0;
    while pos < buf.len() {
        let n = file.seek_read(&mut buf[pos..], offset + pos as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "unexpected end of file during seek_read",
            ));
        }
        pos += n;
    }
    Ok(())
}

/// Pushes written bytes to the OS, and to the disk when `sync` is set.
pub fn flush(file: &File, sync: bool, operation: &'static str) -> Result<(), DbfError> {
    if sync {
        file.sync_data()
            .map_err(|e| classify_io_error(e, operation))?;
    }
    Ok(())
}
