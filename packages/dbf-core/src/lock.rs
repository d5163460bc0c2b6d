//! Cross-process advisory byte-range locking.
//!
//! DBF files are shared between independent processes with no coordinator.
//! Writers agree to hold an exclusive lock on a fixed window far past the
//! data region before touching the file; the window itself is never
//! written, so record I/O is unaffected by the lock.
//!
//! On Linux the lock is an open-file-description lock, so two handles in
//! the same process contend as well. Other Unix systems fall back to POSIX
//! record locks, which are owned by the process.

use std::fs::File;
use std::io;

/// Lock ownership of an open DBF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock held
    None,
    /// Byte-range lock acquired through `DbfFile::flock`
    File,
    /// Access is exclusive by configuration; nothing to acquire or release
    Exclusive,
}

impl LockState {
    pub fn is_locked(self) -> bool {
        self != LockState::None
    }
}

/// The conventional lock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLock {
    pub offset: u64,
    pub length: u64,
}

impl RangeLock {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Makes one non-blocking attempt to lock the window exclusively.
    ///
    /// Returns `Ok(false)` when another holder has it.
    pub fn try_acquire(&self, file: &File) -> io::Result<bool> {
        match imp::set_lock(file, self, true) {
            Ok(()) => Ok(true),
            Err(e) if is_contention(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Releases the window.
    pub fn release(&self, file: &File) -> io::Result<()> {
        imp::set_lock(file, self, false)
    }
}

fn is_contention(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    #[cfg(unix)]
    {
        matches!(error.raw_os_error(), Some(code) if code == libc::EACCES || code == libc::EAGAIN)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(unix)]
mod imp {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    use super::RangeLock;

    #[cfg(target_os = "linux")]
    const SET_LOCK: libc::c_int = libc::F_OFD_SETLK;
    #[cfg(not(target_os = "linux"))]
    const SET_LOCK: libc::c_int = libc::F_SETLK;

    pub(super) fn set_lock(file: &File, range: &RangeLock, exclusive: bool) -> io::Result<()> {
        let start = libc::off_t::try_from(range.offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "lock offset out of range"))?;
        let len = libc::off_t::try_from(range.length)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "lock length out of range"))?;

        // SAFETY: `flock` is a plain C struct; all-zero is a valid value and
        // open-file-description locks require `l_pid == 0`.
        let mut fl: libc::flock = unsafe { std::mem::zeroed() };
        fl.l_type = if exclusive {
            libc::F_WRLCK as libc::c_short
        } else {
            libc::F_UNLCK as libc::c_short
        };
        fl.l_whence = libc::SEEK_SET as libc::c_short;
        fl.l_start = start;
        fl.l_len = len;

        // SAFETY: the descriptor is owned by `file` for the duration of the
        // call and `fl` is a valid, initialized `flock`.
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), SET_LOCK, &fl as *const libc::flock) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    use std::fs::File;
    use std::io;

    use super::RangeLock;

    pub(super) fn set_lock(_file: &File, _range: &RangeLock, _exclusive: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "byte-range locking is only implemented on Unix",
        ))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::tempdir;

    fn open(path: &std::path::Path) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .unwrap()
    }

    #[test]
    fn test_second_handle_contends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock.dbf");
        let a = open(&path);
        let b = open(&path);
        let window = RangeLock::new(1_000_000_001, 1_000_000_000);

        assert!(window.try_acquire(&a).unwrap());
        assert!(!window.try_acquire(&b).unwrap());

        window.release(&a).unwrap();
        assert!(window.try_acquire(&b).unwrap());
        window.release(&b).unwrap();
    }

    #[test]
    fn test_disjoint_windows_do_not_contend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock.dbf");
        let a = open(&path);
        let b = open(&path);

        assert!(RangeLock::new(100, 10).try_acquire(&a).unwrap());
        assert!(RangeLock::new(200, 10).try_acquire(&b).unwrap());
    }

    #[test]
    fn test_lock_does_not_grow_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock.dbf");
        let a = open(&path);
        RangeLock::new(1_000_000_001, 1_000_000_000)
            .try_acquire(&a)
            .unwrap();
        assert_eq!(a.metadata().unwrap().len(), 0);
    }
}
