//! DBF file engine.
//!
//! `DbfFile` owns the file handle, header, descriptor table and the single
//! record buffer. Every mutation flows through the advisory lock, then the
//! record buffer, then a positioned write in `commit` or `record_status`.

mod guard;

pub use guard::FileLockGuard;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::DbfConfig;
use crate::date;
use crate::error::{DbfError, Result};
use crate::header::{
    DbfHeader, DESCRIPTOR_TERMINATOR, END_OF_DATA, HEADER_SIZE, RECORD_COUNT_OFFSET,
};
use crate::io_utils::{self, classify_io_error};
use crate::lock::{LockState, RangeLock};
use crate::record::RecordBuffer;
use crate::table::{FieldDescriptor, FieldSpec, FieldTable, FIELD_DESC_SIZE};

/// An open DBF file with one staged record.
#[derive(Debug)]
pub struct DbfFile {
    path: PathBuf,
    file: File,
    header: DbfHeader,
    fields: FieldTable,
    buffer: RecordBuffer,
    /// 1-based record held in `buffer`, 0 when none
    record: u32,
    /// Buffer was staged by `append` and lands after the last record
    appending: bool,
    /// File handle is writable
    update: bool,
    locked: LockState,
    modified: bool,
    lock_range: RangeLock,
    sync_writes: bool,
}

impl DbfFile {
    /// Creates a new DBF file with the default configuration.
    pub fn create<P: AsRef<Path>>(path: P, schema: &[FieldSpec]) -> Result<Self> {
        Self::create_with_config(path, schema, &DbfConfig::default())
    }

    /// Creates (or truncates) `path` and writes the header and field
    /// descriptors for `schema` immediately.
    ///
    /// The schema is validated before the file is touched.
    ///
    /// # Errors
    /// `DbfError::Schema` for an absent or out-of-bounds schema,
    /// `DbfError::Io` if the file cannot be created or written.
    pub fn create_with_config<P: AsRef<Path>>(
        path: P,
        schema: &[FieldSpec],
        config: &DbfConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fields = FieldTable::build(schema)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| classify_io_error(e, "dbf_file()"))?;

        let header = DbfHeader::new(
            date::header_bytes(date::today()),
            fields.header_length() as u16,
            fields.record_length() as u16,
        );
        let buffer = RecordBuffer::new(fields.record_length());

        let mut dbf = Self {
            path,
            file,
            header,
            fields,
            buffer,
            record: 0,
            appending: false,
            update: true,
            locked: Self::initial_lock_state(config),
            modified: false,
            lock_range: RangeLock::new(config.lock_offset, config.lock_length),
            sync_writes: config.sync_writes,
        };
        dbf.write_header()?;

        info!(
            path = %dbf.path.display(),
            fields = dbf.fields.len(),
            rec_len = dbf.header.rec_len,
            "Created DBF file"
        );
        Ok(dbf)
    }

    /// Opens an existing DBF file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &DbfConfig::default())
    }

    /// Opens an existing DBF file and validates its header block.
    ///
    /// # Errors
    /// `DbfError::Io` if the file cannot be opened or read,
    /// `DbfError::CorruptHeader` if the header or descriptors are invalid.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &DbfConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let update = !config.read_only;

        let file = OpenOptions::new()
            .read(true)
            .write(update)
            .open(&path)
            .map_err(|e| classify_io_error(e, "open()"))?;

        let mut raw = [0u8; HEADER_SIZE];
        io_utils::read_exact_at(&file, &mut raw, 0).map_err(|e| classify_io_error(e, "open()"))?;
        let header = DbfHeader::decode(&raw)?;
        let fields = Self::read_descriptors(&file, &header)?;

        if fields.record_length() != header.rec_len as usize {
            return Err(DbfError::CorruptHeader(format!(
                "record length {} does not match fields ({})",
                header.rec_len,
                fields.record_length()
            )));
        }

        let buffer = RecordBuffer::new(fields.record_length());
        debug!(
            path = %path.display(),
            records = header.lastrec(),
            read_only = !update,
            "Opened DBF file"
        );

        Ok(Self {
            path,
            file,
            header,
            fields,
            buffer,
            record: 0,
            appending: false,
            update,
            locked: Self::initial_lock_state(config),
            modified: false,
            lock_range: RangeLock::new(config.lock_offset, config.lock_length),
            sync_writes: config.sync_writes,
        })
    }

    fn initial_lock_state(config: &DbfConfig) -> LockState {
        if config.exclusive {
            LockState::Exclusive
        } else {
            LockState::None
        }
    }

    fn read_descriptors(file: &File, header: &DbfHeader) -> Result<FieldTable> {
        let length = header.length as usize;
        if length < HEADER_SIZE + FIELD_DESC_SIZE + 1 {
            return Err(DbfError::CorruptHeader(format!(
                "header length {} too small",
                length
            )));
        }

        let mut block = vec![0u8; length - HEADER_SIZE];
        io_utils::read_exact_at(file, &mut block, HEADER_SIZE as u64)
            .map_err(|e| classify_io_error(e, "open()"))?;

        let mut decoded = Vec::new();
        let mut terminated = false;
        for chunk in block.chunks(FIELD_DESC_SIZE) {
            if chunk[0] == DESCRIPTOR_TERMINATOR[0] {
                terminated = true;
                break;
            }
            let Ok(raw) = <&[u8; FIELD_DESC_SIZE]>::try_from(chunk) else {
                break;
            };
            decoded.push(FieldDescriptor::decode(raw)?);
        }
        if !terminated {
            return Err(DbfError::CorruptHeader(
                "field descriptor block is not terminated".to_string(),
            ));
        }

        FieldTable::from_decoded(decoded)
    }

    /// Writes the header, descriptor block and terminator at offset 0.
    fn write_header(&mut self) -> Result<()> {
        const OP: &str = "write_header()";
        let mut block = Vec::with_capacity(self.fields.header_length());
        block.extend_from_slice(&self.header.encode());
        for field in &self.fields {
            block.extend_from_slice(&field.encode());
        }
        block.extend_from_slice(&DESCRIPTOR_TERMINATOR);

        io_utils::write_all_at(&self.file, &block, 0).map_err(|e| classify_io_error(e, OP))?;
        io_utils::flush(&self.file, self.sync_writes, OP)
    }

    /// Converts a record number into the header's signed count.
    fn checked_total(&self, total: u32, operation: &'static str) -> Result<i32> {
        i32::try_from(total).map_err(|_| DbfError::Position {
            operation,
            record: total,
            last: self.lastrec(),
        })
    }

    /// Persists the record count at its fixed header offset.
    fn write_total(&mut self, count: i32) -> Result<()> {
        io_utils::write_all_at(&self.file, &count.to_le_bytes(), RECORD_COUNT_OFFSET)
            .map_err(|e| classify_io_error(e, "write_total()"))?;
        self.header.rec_no = count;
        Ok(())
    }

    /// Re-reads the record count another writer may have advanced.
    fn refresh_total(&mut self) -> Result<()> {
        let mut count = [0u8; 4];
        io_utils::read_exact_at(&self.file, &mut count, RECORD_COUNT_OFFSET)
            .map_err(|e| classify_io_error(e, "flock()"))?;
        let total = i32::from_le_bytes(count);
        if total != self.header.rec_no {
            debug!(
                path = %self.path.display(),
                previous = self.header.rec_no,
                current = total,
                "Record count changed on disk"
            );
            self.header.rec_no = total.max(0);
        }
        Ok(())
    }

    /// Acquires the advisory lock without waiting.
    ///
    /// Returns `Ok(true)` if the lock is held afterwards (including when it
    /// already was) and `Ok(false)` if another writer holds it.
    pub fn flock(&mut self) -> Result<bool> {
        if self.locked.is_locked() {
            return Ok(true);
        }
        let acquired = self
            .lock_range
            .try_acquire(&self.file)
            .map_err(|e| classify_io_error(e, "flock()"))?;
        if !acquired {
            debug!(path = %self.path.display(), "Lock held by another writer");
            return Ok(false);
        }

        self.locked = LockState::File;
        debug!(path = %self.path.display(), "Acquired file lock");
        if let Err(e) = self.refresh_total() {
            // Keep the lock state consistent with the OS.
            let _ = self.lock_range.release(&self.file);
            self.locked = LockState::None;
            return Err(e);
        }
        Ok(true)
    }

    /// Releases a lock taken by `flock`; no-op otherwise.
    pub fn unlock(&mut self) -> Result<()> {
        if self.locked == LockState::File {
            self.lock_range
                .release(&self.file)
                .map_err(|e| classify_io_error(e, "unlock()"))?;
            self.locked = LockState::None;
            debug!(path = %self.path.display(), "Released file lock");
        }
        Ok(())
    }

    /// Acquires the lock for the lifetime of the returned guard.
    ///
    /// Returns `Ok(None)` on contention. A lock that was already held
    /// before the call is left held when the guard drops.
    pub fn try_lock(&mut self) -> Result<Option<FileLockGuard<'_>>> {
        let release_on_drop = self.locked == LockState::None;
        if self.flock()? {
            Ok(Some(FileLockGuard::new(self, release_on_drop)))
        } else {
            Ok(None)
        }
    }

    /// Stages a blank record after the last one. Nothing is written until
    /// `commit`.
    pub fn append(&mut self) -> Result<()> {
        self.require_update("append()")?;
        self.buffer.reset();
        self.record = self.lastrec() + 1;
        self.appending = true;
        self.modified = true;
        Ok(())
    }

    /// Sets the deletion flag of the current record and writes that byte.
    ///
    /// For a record staged by `append` the flag is kept in the buffer and
    /// written by `commit`. Does not clear `modified`.
    ///
    /// # Errors
    /// `DbfError::Lock` when unlocked (nothing is written),
    /// `DbfError::Position` without an addressable current record.
    pub fn record_status(&mut self, remove: bool) -> Result<()> {
        const OP: &str = "record_status()";
        if !self.locked.is_locked() {
            return Err(DbfError::Lock { operation: OP });
        }
        self.require_update(OP)?;
        let offset = self.current_offset(OP)?;

        self.buffer.set_deleted(remove);
        // A staged append is not on disk, even once `lastrec()` reaches its number.
        if !self.appending && self.record <= self.lastrec() {
            io_utils::write_all_at(&self.file, &self.buffer.as_record()[..1], offset)
                .map_err(|e| classify_io_error(e, OP))?;
            io_utils::flush(&self.file, self.sync_writes, OP)?;
        }
        debug!(record = self.record, deleted = remove, "Record status written");
        Ok(())
    }

    /// Writes the staged record to disk.
    ///
    /// An append also writes the end-of-data byte after the record and the
    /// new record count into the header. No-op when nothing is modified.
    /// On error `modified` stays set so the caller can retry or discard.
    pub fn commit(&mut self) -> Result<()> {
        const OP: &str = "commit()";
        if !self.locked.is_locked() {
            return Err(DbfError::Lock { operation: OP });
        }
        if !self.modified {
            return Ok(());
        }
        self.require_update(OP)?;
        if self.record == 0 {
            return Err(DbfError::Update {
                operation: OP,
                reason: "no record staged",
            });
        }
        if self.appending {
            self.record = self.lastrec() + 1;
        }
        let offset = self.current_offset(OP)?;
        let added = self.record == self.lastrec() + 1;
        let total = if added {
            Some(self.checked_total(self.record, OP)?)
        } else {
            None
        };

        io_utils::write_all_at(&self.file, self.buffer.as_record(), offset)
            .map_err(|e| classify_io_error(e, OP))?;
        if let Some(total) = total {
            let eof = offset + self.buffer.rec_len() as u64;
            io_utils::write_all_at(&self.file, &[END_OF_DATA], eof)
                .map_err(|e| classify_io_error(e, OP))?;
            self.write_total(total)?;
        }
        io_utils::flush(&self.file, self.sync_writes, OP)?;

        self.modified = false;
        self.appending = false;
        debug!(record = self.record, appended = total.is_some(), "Record committed");
        Ok(())
    }

    /// Loads record `record` from disk into the buffer.
    ///
    /// # Errors
    /// `DbfError::Update` while the buffer holds uncommitted changes,
    /// `DbfError::Position` if `record` is not in `1..=lastrec()`.
    pub fn goto(&mut self, record: u32) -> Result<()> {
        const OP: &str = "goto()";
        if self.modified {
            return Err(DbfError::Update {
                operation: OP,
                reason: "uncommitted changes",
            });
        }
        if record == 0 || record > self.lastrec() {
            return Err(DbfError::Position {
                operation: OP,
                record,
                last: self.lastrec(),
            });
        }
        let offset = self.record_offset(record, OP)?;
        let mut raw = vec![0u8; self.buffer.rec_len()];
        io_utils::read_exact_at(&self.file, &mut raw, offset).map_err(|e| classify_io_error(e, OP))?;

        self.buffer.load(&raw);
        self.record = record;
        self.appending = false;
        Ok(())
    }

    /// Drops staged changes; the buffer no longer represents a record.
    pub fn discard(&mut self) {
        if self.modified {
            debug!(record = self.record, "Discarded staged record");
        }
        self.buffer.reset();
        self.record = 0;
        self.appending = false;
        self.modified = false;
    }

    /// Writes a date into a `D` field of the current record.
    pub fn insert_date(&mut self, field: &str, value: NaiveDate) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_date(desc, value))
    }

    /// Writes a timestamp into a binary `T` field of the current record.
    pub fn insert_datetime(&mut self, field: &str, value: NaiveDateTime) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_datetime(desc, value))
    }

    /// Writes an integer into an `N` field of the current record.
    pub fn insert_int(&mut self, field: &str, value: i64) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_int(desc, value))
    }

    /// Writes a float into an `N` field of the current record.
    pub fn insert_float(&mut self, field: &str, value: f64) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_float(desc, value))
    }

    /// Writes text into a field of the current record, space-padded.
    pub fn insert_str(&mut self, field: &str, value: &str) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_str(desc, value))
    }

    /// Writes a logical value into an `L` field of the current record.
    pub fn insert_bool(&mut self, field: &str, value: bool) -> Result<()> {
        self.insert_with(field, |buffer, desc| buffer.put_bool(desc, value))
    }

    fn insert_with<F>(&mut self, field: &str, put: F) -> Result<()>
    where
        F: FnOnce(&mut RecordBuffer, &FieldDescriptor) -> Result<()>,
    {
        const OP: &str = "insert()";
        self.require_update(OP)?;
        if !self.is_current() {
            return Err(DbfError::Position {
                operation: OP,
                record: self.record,
                last: self.lastrec(),
            });
        }
        let desc = self.fields.lookup(field, OP)?;
        put(&mut self.buffer, desc)?;
        self.modified = true;
        Ok(())
    }

    fn require_update(&self, operation: &'static str) -> Result<()> {
        if !self.update {
            return Err(DbfError::Update {
                operation,
                reason: "file opened read-only",
            });
        }
        Ok(())
    }

    /// The buffer corresponds to an existing or staged record position.
    fn is_current(&self) -> bool {
        self.record != 0 && self.record <= self.lastrec() + 1
    }

    fn current_offset(&self, operation: &'static str) -> Result<u64> {
        if !self.is_current() {
            return Err(DbfError::Position {
                operation,
                record: self.record,
                last: self.lastrec(),
            });
        }
        self.record_offset(self.record, operation)
    }

    fn record_offset(&self, record: u32, operation: &'static str) -> Result<u64> {
        self.header
            .record_offset(record)
            .ok_or(DbfError::Position {
                operation,
                record,
                last: self.lastrec(),
            })
    }

    /// Number of the last record on disk.
    pub fn lastrec(&self) -> u32 {
        self.header.lastrec()
    }

    /// Record currently held in the buffer, 0 when none.
    pub fn recno(&self) -> u32 {
        self.record
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn lock_state(&self) -> LockState {
        self.locked
    }

    pub fn is_read_only(&self) -> bool {
        !self.update
    }

    pub fn header(&self) -> &DbfHeader {
        &self.header
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The staged record bytes, deletion flag included.
    pub fn record_bytes(&self) -> &[u8] {
        self.buffer.as_record()
    }

    /// Whether the buffered record carries the deletion flag.
    pub fn is_deleted(&self) -> bool {
        self.buffer.is_deleted()
    }

    /// Raw bytes of `field` in the buffered record.
    pub fn field_bytes(&self, field: &str) -> Result<&[u8]> {
        let desc = self.fields.lookup(field, "field()")?;
        Ok(self.buffer.field(desc))
    }

    /// Text of `field` with trailing spaces removed.
    pub fn field_string(&self, field: &str) -> Result<String> {
        let bytes = self.field_bytes(field)?;
        Ok(String::from_utf8_lossy(bytes).trim_end().to_string())
    }

    /// Value of a `D` field; `None` when blank or malformed.
    pub fn field_date(&self, field: &str) -> Result<Option<NaiveDate>> {
        Ok(date::parse_dbf_text(self.field_bytes(field)?))
    }

    /// Value of a `T` field; `None` when null.
    pub fn field_datetime(&self, field: &str) -> Result<Option<NaiveDateTime>> {
        Ok(date::parse_julian_bytes(self.field_bytes(field)?))
    }
}

impl Drop for DbfFile {
    fn drop(&mut self) {
        if self.modified {
            warn!(
                path = %self.path.display(),
                record = self.record,
                "Closing DBF file with uncommitted record"
            );
        }
        if let Err(e) = self.unlock() {
            warn!(path = %self.path.display(), error = %e, "Failed to release lock on close");
        }
    }
}
