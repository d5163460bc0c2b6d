//! Scoped lock acquisition.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::DbfFile;
use crate::error::Result;

/// Holds the advisory lock on a `DbfFile` and releases it when dropped,
/// on every exit path including `?` and panics.
#[derive(Debug)]
pub struct FileLockGuard<'a> {
    file: &'a mut DbfFile,
    release_on_drop: bool,
}

impl<'a> FileLockGuard<'a> {
    pub(super) fn new(file: &'a mut DbfFile, release_on_drop: bool) -> Self {
        Self {
            file,
            release_on_drop,
        }
    }

    /// Releases the lock now, reporting a failed release.
    pub fn unlock(mut self) -> Result<()> {
        let release = std::mem::replace(&mut self.release_on_drop, false);
        if release {
            self.file.unlock()?;
        }
        Ok(())
    }
}

impl Deref for FileLockGuard<'_> {
    type Target = DbfFile;

    fn deref(&self) -> &DbfFile {
        self.file
    }
}

impl DerefMut for FileLockGuard<'_> {
    fn deref_mut(&mut self) -> &mut DbfFile {
        self.file
    }
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        if !self.release_on_drop {
            return;
        }
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.file.path().display(), error = %e, "Failed to release file lock");
        }
    }
}
