//! SchematicProcessor - per-file retry state machine

use crate::config::RetryConfig;
use crate::errors::Result;
use crate::features::loader::{DocumentSource, MIN_DOCUMENT_BYTES};
use crate::features::quarantine::{QuarantineAction, QuarantineManager};
use crate::features::sanitizer::Sanitizer;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Final state of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Sanitizer flagged the document and quarantine completed
    AnomalyHandled(QuarantineAction),
    /// Loaded and sanitized, nothing to do
    Clean,
    /// Not a real upload yet, or every attempt failed. File left as found.
    NotHandled,
}

impl ProcessOutcome {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, ProcessOutcome::AnomalyHandled(_))
    }
}

type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

pub struct SchematicProcessor {
    source: Arc<dyn DocumentSource>,
    sanitizer: Sanitizer,
    quarantine: QuarantineManager,
    retry: RetryConfig,
    sleep: SleepFn,
}

impl SchematicProcessor {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        sanitizer: Sanitizer,
        quarantine: QuarantineManager,
        retry: RetryConfig,
    ) -> Self {
        Self {
            source,
            sanitizer,
            quarantine,
            retry,
            sleep: Arc::new(std::thread::sleep),
        }
    }

    /// Replace the backoff sleep (tests record delays instead of waiting)
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Process one upload. Never returns an error: failures end in
    /// `NotHandled` after a warning.
    pub fn process_file(&self, path: &Path, submitter: &str) -> ProcessOutcome {
        if !is_plausible_upload(path) {
            debug!("Skipping {}: missing or too small", path.display());
            return ProcessOutcome::NotHandled;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(path, submitter) {
                Ok(outcome) => return outcome,
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        display_name(path),
                        err.kind_name(),
                        delay
                    );
                    (self.sleep)(delay);
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        file = %display_name(path),
                        submitter = %submitter,
                        kind = err.kind_name(),
                        attempts = attempt,
                        "Failed to process schematic: {}",
                        err
                    );
                    return ProcessOutcome::NotHandled;
                }
            }
        }
    }

    fn attempt(&self, path: &Path, submitter: &str) -> Result<ProcessOutcome> {
        let mut document = self.source.load(path)?;
        let verdict = self.sanitizer.sanitize(&mut document);
        if verdict.is_clean() {
            debug!("{} is clean", display_name(path));
            return Ok(ProcessOutcome::Clean);
        }

        let action = self.quarantine.handle(path, submitter, &document, verdict)?;
        info!(
            file = %display_name(path),
            submitter = %submitter,
            banned = verdict.banned_content_found,
            pruned = verdict.structurally_modified,
            "Handled anomalous schematic: {:?}",
            action
        );
        Ok(ProcessOutcome::AnomalyHandled(action))
    }
}

fn is_plausible_upload(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() >= MIN_DOCUMENT_BYTES)
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordPolicy;
    use crate::errors::GuardError;
    use crate::features::nbt::{GzipNbtCodec, NbtCompound, NbtDocument, Tag};
    use crate::features::quarantine::AnomalyNotifier;
    use crate::features::sanitizer::SanitizePolicy;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct NullNotifier;

    impl AnomalyNotifier for NullNotifier {
        fn notify(&self, _message: &str) {}
    }

    /// Fails with the given error a fixed number of times, then returns doc
    struct ScriptedSource {
        failures: usize,
        make_error: fn(&Path) -> GuardError,
        document: NbtDocument,
        calls: AtomicUsize,
    }

    impl DocumentSource for ScriptedSource {
        fn load(&self, path: &Path) -> Result<NbtDocument> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.make_error)(path));
            }
            Ok(self.document.clone())
        }
    }

    fn clean_document() -> NbtDocument {
        let root: NbtCompound = [("name", Tag::from("house"))].into_iter().collect();
        NbtDocument::new("", root)
    }

    fn truncated(_: &Path) -> GuardError {
        GuardError::TruncatedOrCorruptStream("unexpected end of file".to_string())
    }

    fn bad_magic(_: &Path) -> GuardError {
        GuardError::invalid_format("bad magic")
    }

    fn setup(
        source: Arc<ScriptedSource>,
    ) -> (TempDir, PathBuf, SchematicProcessor, Arc<Mutex<Vec<Duration>>>) {
        let dir = TempDir::new().unwrap();
        let upload = dir.path().join("uploaded").join("steve");
        fs::create_dir_all(&upload).unwrap();
        let path = upload.join("house.nbt");
        fs::write(&path, vec![0x1f, 0x8b, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();

        let sanitizer = Sanitizer::new(
            SanitizePolicy::default(),
            Arc::new(KeywordPolicy::new(true, ["minecraft:bedrock"])),
        );
        let quarantine = QuarantineManager::new(
            dir.path().join("anomaly"),
            Arc::new(GzipNbtCodec::new()),
            Arc::new(NullNotifier),
        );
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = delays.clone();
        let processor =
            SchematicProcessor::new(source, sanitizer, quarantine, RetryConfig::default())
                .with_sleep(move |d| recorded.lock().push(d));
        (dir, path, processor, delays)
    }

    fn scripted(failures: usize, make_error: fn(&Path) -> GuardError) -> Arc<ScriptedSource> {
        Arc::new(ScriptedSource {
            failures,
            make_error,
            document: clean_document(),
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_clean_file_loaded_once() {
        let source = scripted(0, truncated);
        let (_dir, path, processor, delays) = setup(source.clone());

        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::Clean);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(delays.lock().is_empty());
    }

    #[test]
    fn test_truncated_stream_retries_with_linear_backoff() {
        let source = scripted(usize::MAX, truncated);
        let (_dir, path, processor, delays) = setup(source.clone());

        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::NotHandled);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *delays.lock(),
            vec![Duration::from_millis(300), Duration::from_millis(600)]
        );
    }

    #[test]
    fn test_retry_succeeds_after_transient_failure() {
        let source = scripted(1, truncated);
        let (_dir, path, processor, delays) = setup(source.clone());

        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::Clean);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(delays.lock().len(), 1);
    }

    #[test]
    fn test_invalid_format_is_not_retried() {
        let source = scripted(usize::MAX, bad_magic);
        let (_dir, path, processor, delays) = setup(source.clone());

        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::NotHandled);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(delays.lock().is_empty());
    }

    #[test]
    fn test_missing_or_tiny_file_short_circuits() {
        let source = scripted(0, truncated);
        let (_dir, path, processor, _) = setup(source.clone());

        fs::write(&path, b"tiny").unwrap();
        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::NotHandled);

        fs::remove_file(&path).unwrap();
        assert_eq!(processor.process_file(&path, "steve"), ProcessOutcome::NotHandled);

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_banned_document_is_quarantined() {
        let mut document = clean_document();
        document
            .root
            .insert("block", Tag::from("minecraft:bedrock"));
        let source = Arc::new(ScriptedSource {
            failures: 0,
            make_error: truncated,
            document,
            calls: AtomicUsize::new(0),
        });
        let (dir, path, processor, _) = setup(source);

        let outcome = processor.process_file(&path, "steve");
        assert_eq!(outcome, ProcessOutcome::AnomalyHandled(QuarantineAction::Truncated));
        assert!(outcome.is_anomaly());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(dir.path().join("anomaly/steve/house.nbt").exists());
    }
}
