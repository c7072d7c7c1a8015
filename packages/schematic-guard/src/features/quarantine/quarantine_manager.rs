//! QuarantineManager - copy, notify, then truncate or rewrite

use super::notifier::{anomaly_message, AnomalyNotifier};
use crate::errors::{GuardError, Result};
use crate::features::nbt::{DocumentCodec, NbtDocument};
use crate::features::sanitizer::SanitizeVerdict;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What happened to the original upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineAction {
    /// Banned content: original emptied to zero bytes
    Truncated,
    /// Pruned only: original replaced by the sanitized tree
    Rewritten,
}

pub struct QuarantineManager {
    anomaly_dir: PathBuf,
    codec: Arc<dyn DocumentCodec>,
    notifier: Arc<dyn AnomalyNotifier>,
}

impl QuarantineManager {
    pub fn new(
        anomaly_dir: impl Into<PathBuf>,
        codec: Arc<dyn DocumentCodec>,
        notifier: Arc<dyn AnomalyNotifier>,
    ) -> Self {
        Self {
            anomaly_dir: anomaly_dir.into(),
            codec,
            notifier,
        }
    }

    pub fn anomaly_dir(&self) -> &Path {
        &self.anomaly_dir
    }

    /// Handle a flagged upload. `document` is the already-sanitized tree.
    ///
    /// Must only be called with a non-clean verdict. Any error leaves the
    /// original file as it was.
    pub fn handle(
        &self,
        path: &Path,
        submitter: &str,
        document: &NbtDocument,
        verdict: SanitizeVerdict,
    ) -> Result<QuarantineAction> {
        debug_assert!(!verdict.is_clean());

        let file_name = path.file_name().ok_or_else(|| {
            GuardError::io(
                format!("quarantine {}", path.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        let submitter_dir = self.anomaly_dir.join(submitter);
        fs::create_dir_all(&submitter_dir).map_err(|e| {
            GuardError::io(format!("create {}", submitter_dir.display()), e)
        })?;

        let backup = submitter_dir.join(file_name);
        copy_atomically(path, &backup)?;
        tracing::debug!("Quarantined {} to {}", path.display(), backup.display());

        self.notifier
            .notify(&anomaly_message(submitter, &file_name.to_string_lossy()));

        if verdict.banned_content_found {
            truncate(path)?;
            return Ok(QuarantineAction::Truncated);
        }

        self.rewrite_atomically(path, document)?;
        Ok(QuarantineAction::Rewritten)
    }

    /// Encode to a hidden sibling temp file, then rename over the original.
    /// The temp file is removed on every failure path.
    pub fn rewrite_atomically(&self, path: &Path, document: &NbtDocument) -> Result<()> {
        let bytes = self.codec.encode(document)?;
        let mut tmp = sibling_temp_file(path)?;

        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| GuardError::io(format!("write temp for {}", path.display()), e))?;

        tmp.persist(path)
            .map_err(|e| GuardError::io(format!("replace {}", path.display()), e.error))?;
        Ok(())
    }
}

fn sibling_temp_file(path: &Path) -> Result<tempfile::NamedTempFile> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| GuardError::io(format!("create temp in {}", parent.display()), e))
}

/// Copy through a temp file in the destination directory so a failed copy
/// never leaves a partial backup under the final name
fn copy_atomically(src: &Path, dest: &Path) -> Result<()> {
    let mut source =
        File::open(src).map_err(|e| GuardError::io(format!("open {}", src.display()), e))?;
    let mut tmp = sibling_temp_file(dest)?;

    io::copy(&mut source, &mut tmp)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| GuardError::io(format!("copy {} to quarantine", src.display()), e))?;

    tmp.persist(dest)
        .map_err(|e| GuardError::io(format!("persist {}", dest.display()), e.error))?;
    Ok(())
}

fn truncate(path: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| GuardError::io(format!("truncate {}", path.display()), e))
}
