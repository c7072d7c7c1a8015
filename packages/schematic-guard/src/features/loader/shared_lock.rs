//! Scoped shared (read) lock on an open file
//!
//! Uses `fs2` rather than `std::fs::File::lock_shared` (Rust 1.89+).

use crate::errors::{GuardError, Result};
use fs2::FileExt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Holds a shared lock until dropped
pub(crate) struct SharedLockGuard<'a> {
    file: &'a File,
}

impl<'a> SharedLockGuard<'a> {
    /// Non-blocking; a writer holding an exclusive lock yields `LockUnavailable`
    pub(crate) fn try_acquire(file: &'a File, path: &Path) -> Result<Self> {
        // Fully qualified: std's inherent File::try_lock_shared has a different error type
        match FileExt::try_lock_shared(file) {
            Ok(()) => Ok(Self { file }),
            Err(e) if is_contended(&e) => Err(GuardError::LockUnavailable {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(GuardError::io(
                format!("lock {}", path.display()),
                e,
            )),
        }
    }
}

impl Drop for SharedLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file) {
            tracing::debug!("Failed to release shared lock: {}", e);
        }
    }
}

pub(crate) fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Windows refuses to open a file another process opened without sharing
#[cfg(windows)]
pub(crate) fn is_sharing_violation(e: &io::Error) -> bool {
    const ERROR_SHARING_VIOLATION: i32 = 32;
    e.raw_os_error() == Some(ERROR_SHARING_VIOLATION)
}

#[cfg(not(windows))]
pub(crate) fn is_sharing_violation(_e: &io::Error) -> bool {
    false
}
