//! DocumentLoader - locked read + header check + decode

use super::shared_lock::{is_sharing_violation, SharedLockGuard};
use crate::errors::{GuardError, Result};
use crate::features::nbt::{DocumentCodec, NbtDocument};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Anything smaller cannot be a gzip member holding a tag tree
pub const MIN_DOCUMENT_BYTES: u64 = 10;

pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Port: produces a parsed document for a path
///
/// The processor depends on this rather than on [`DocumentLoader`] so the
/// retry loop can be exercised without real contention.
pub trait DocumentSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<NbtDocument>;
}

pub struct DocumentLoader {
    codec: Arc<dyn DocumentCodec>,
}

impl DocumentLoader {
    pub fn new(codec: Arc<dyn DocumentCodec>) -> Self {
        Self { codec }
    }

    /// Read the whole file while holding a shared lock; the lock is released
    /// on every exit path before this returns.
    pub fn read_locked(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path).map_err(|e| {
            if is_sharing_violation(&e) {
                GuardError::LockUnavailable {
                    path: path.to_path_buf(),
                }
            } else {
                GuardError::io(format!("open {}", path.display()), e)
            }
        })?;

        let _lock = SharedLockGuard::try_acquire(&file, path)?;

        let expected = file
            .metadata()
            .map(|m| m.len() as usize)
            .unwrap_or_default();
        let mut bytes = Vec::with_capacity(expected);
        (&file)
            .read_to_end(&mut bytes)
            .map_err(|e| GuardError::io(format!("read {}", path.display()), e))?;
        Ok(bytes)
    }
}

/// Reject files that are too small or lack the gzip magic
pub fn validate_header(bytes: &[u8]) -> Result<()> {
    if (bytes.len() as u64) < MIN_DOCUMENT_BYTES {
        return Err(GuardError::invalid_format(format!(
            "file too small ({} bytes)",
            bytes.len()
        )));
    }
    if bytes[..2] != GZIP_MAGIC {
        return Err(GuardError::invalid_format(format!(
            "bad magic bytes {:02X} {:02X}",
            bytes[0], bytes[1]
        )));
    }
    Ok(())
}

impl DocumentSource for DocumentLoader {
    fn load(&self, path: &Path) -> Result<NbtDocument> {
        let bytes = self.read_locked(path)?;
        validate_header(&bytes)?;
        Ok(self.codec.decode(&bytes)?)
    }
}
