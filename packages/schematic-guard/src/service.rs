//! SchematicGuard - wires the watcher, debounce pool and processor together

use crate::config::{ConfigHandle, GuardPaths, KeywordPolicySource};
use crate::errors::{GuardError, Result};
use crate::features::file_watcher::{
    DebounceScheduler, HostExecutor, ReadyFileHandler, WatchTree, WriteObserver,
};
use crate::features::loader::DocumentLoader;
use crate::features::nbt::GzipNbtCodec;
use crate::features::processor::SchematicProcessor;
use crate::features::quarantine::{AnomalyNotifier, QuarantineManager};
use crate::features::sanitizer::Sanitizer;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Build the per-file pipeline from the current config snapshot.
///
/// The keyword check reads the handle on every file, so keyword edits apply
/// without rebuilding. Retry and sanitize settings are fixed at build time.
pub fn build_processor(
    paths: &GuardPaths,
    config: &Arc<ConfigHandle>,
    notifier: Arc<dyn AnomalyNotifier>,
) -> SchematicProcessor {
    let snapshot = config.snapshot();
    let codec = Arc::new(GzipNbtCodec::new());
    let keywords: Arc<dyn KeywordPolicySource> = config.clone();

    SchematicProcessor::new(
        Arc::new(DocumentLoader::new(codec.clone())),
        Sanitizer::new(snapshot.sanitize_policy(), keywords),
        QuarantineManager::new(paths.anomaly_dir.clone(), codec, notifier),
        snapshot.retry.clone(),
    )
}

/// Settled files go to the host context; the debounce thread never
/// touches the file itself
struct HostDispatch {
    host: Arc<dyn HostExecutor>,
    processor: Arc<SchematicProcessor>,
}

impl ReadyFileHandler for HostDispatch {
    fn on_ready(&self, path: PathBuf, submitter: String) {
        let processor = self.processor.clone();
        self.host.submit(Box::new(move || {
            processor.process_file(&path, &submitter);
        }));
    }
}

/// Running guard over one deployment's upload directory
pub struct SchematicGuard {
    paths: GuardPaths,
    processor: Arc<SchematicProcessor>,
    scheduler: Arc<DebounceScheduler>,
    watch_tree: WatchTree,
    stopped: bool,
}

impl SchematicGuard {
    /// Create the upload tree if needed, register it, and start watching
    pub fn start(
        paths: GuardPaths,
        config: Arc<ConfigHandle>,
        host: Arc<dyn HostExecutor>,
        notifier: Arc<dyn AnomalyNotifier>,
    ) -> Result<Self> {
        fs::create_dir_all(&paths.uploaded_dir).map_err(|e| {
            GuardError::io(format!("create {}", paths.uploaded_dir.display()), e)
        })?;

        let snapshot = config.snapshot();
        let processor = Arc::new(build_processor(&paths, &config, notifier));
        let dispatch = Arc::new(HostDispatch {
            host,
            processor: processor.clone(),
        });
        let scheduler = Arc::new(DebounceScheduler::new(
            snapshot.stabilization_interval(),
            dispatch,
        )?);

        let observer: Arc<dyn WriteObserver> = scheduler.clone();
        let mut watch_tree = WatchTree::new(snapshot.document_extension.clone(), observer)?;
        watch_tree.register(&paths.uploaded_dir)?;
        watch_tree.start()?;

        tracing::info!(
            "Watching {} ({} directories)",
            paths.uploaded_dir.display(),
            watch_tree.registration_count()
        );

        Ok(Self {
            paths,
            processor,
            scheduler,
            watch_tree,
            stopped: false,
        })
    }

    pub fn paths(&self) -> &GuardPaths {
        &self.paths
    }

    pub fn processor(&self) -> &Arc<SchematicProcessor> {
        &self.processor
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && self.watch_tree.is_running()
    }

    pub fn pending_writes(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Stop watching and drop armed timers. Tasks already handed to the
    /// host executor still run.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.watch_tree.stop();
        self.scheduler.shutdown();
        tracing::info!("Stopped watching {}", self.paths.uploaded_dir.display());
    }
}

impl Drop for SchematicGuard {
    fn drop(&mut self) {
        self.stop();
    }
}
