//! Shared fixtures for schematic-guard integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use schematic_guard::config::RetryConfig;
use schematic_guard::{
    AnomalyNotifier, ConfigHandle, DocumentCodec, DocumentLoader, GuardConfig, GuardPaths,
    GzipNbtCodec, NbtCompound, NbtDocument, NbtList, QuarantineManager, Sanitizer,
    SchematicProcessor, Tag,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Temp deployment root with `schematics/{uploaded,anomaly}` paths
pub struct Deployment {
    pub root: TempDir,
    pub paths: GuardPaths,
}

impl Deployment {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let paths = GuardPaths::from_deployment_root(root.path());
        fs::create_dir_all(&paths.uploaded_dir).unwrap();
        Self { root, paths }
    }

    pub fn upload_dir(&self, submitter: &str) -> PathBuf {
        let dir = self.paths.uploaded_dir.join(submitter);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Encode and write a schematic under `uploaded/<submitter>/<name>`
    pub fn upload(&self, submitter: &str, name: &str, document: &NbtDocument) -> PathBuf {
        let path = self.upload_dir(submitter).join(name);
        fs::write(&path, encode(document)).unwrap();
        path
    }

    pub fn quarantined(&self, submitter: &str, name: &str) -> PathBuf {
        self.paths.anomaly_dir.join(submitter).join(name)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl AnomalyNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub fn encode(document: &NbtDocument) -> Vec<u8> {
    GzipNbtCodec::new().encode(document).unwrap()
}

pub fn decode_file(path: &Path) -> NbtDocument {
    GzipNbtCodec::new().decode(&fs::read(path).unwrap()).unwrap()
}

/// A schematic with one block entry carrying the given item components
pub fn schematic_with_components(components: &[(&str, Tag)]) -> NbtDocument {
    let components: NbtCompound = components
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let item: NbtCompound = [
        ("id", Tag::from("create:clipboard")),
        ("components", Tag::from(components)),
    ]
    .into_iter()
    .collect();
    let block: NbtCompound = [
        ("pos", Tag::List(NbtList::from(vec![Tag::Int(0), Tag::Int(1), Tag::Int(2)]))),
        ("state", Tag::Int(0)),
        ("nbt", Tag::from(item)),
    ]
    .into_iter()
    .collect();
    let root: NbtCompound = [
        ("DataVersion", Tag::Int(3955)),
        ("blocks", Tag::List(NbtList::from(vec![Tag::from(block)]))),
    ]
    .into_iter()
    .collect();
    NbtDocument::new("", root)
}

pub fn clean_schematic() -> NbtDocument {
    schematic_with_components(&[("create:clipboard_pages", Tag::from("page one"))])
}

pub fn schematic_with_palette(block_ids: &[&str]) -> NbtDocument {
    let palette: Vec<Tag> = block_ids
        .iter()
        .map(|id| {
            let entry: NbtCompound = [("Name", Tag::from(*id))].into_iter().collect();
            Tag::from(entry)
        })
        .collect();
    let mut document = clean_schematic();
    document
        .root
        .insert("palette", Tag::List(NbtList::from(palette)));
    document
}

pub fn config_handle(config: GuardConfig) -> Arc<ConfigHandle> {
    Arc::new(ConfigHandle::new(config))
}

/// Processor over real files whose retry sleeps are recorded, not slept
pub fn recording_processor(
    deployment: &Deployment,
    config: &Arc<ConfigHandle>,
    notifier: Arc<RecordingNotifier>,
) -> (SchematicProcessor, Arc<Mutex<Vec<Duration>>>) {
    let snapshot = config.snapshot();
    let codec = Arc::new(GzipNbtCodec::new());
    let delays = Arc::new(Mutex::new(Vec::new()));
    let recorded = delays.clone();

    let processor = SchematicProcessor::new(
        Arc::new(DocumentLoader::new(codec.clone())),
        Sanitizer::new(snapshot.sanitize_policy(), config.clone()),
        QuarantineManager::new(deployment.paths.anomaly_dir.clone(), codec, notifier),
        snapshot.retry.clone(),
    )
    .with_sleep(move |d| recorded.lock().push(d));
    (processor, delays)
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
    }
}

/// Counts WARN events emitted while a closure runs on this thread
#[derive(Clone, Default)]
pub struct WarnCounter {
    count: Arc<AtomicUsize>,
}

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` under a thread-local subscriber and return its result with the
/// number of warnings it logged
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, counter.count())
}
