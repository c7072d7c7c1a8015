//! WatchTree - per-directory notify registrations over the upload tree
//!
//! Every directory gets its own non-recursive registration so that
//! directories created later (a new submitter's folder) are registered
//! as they appear, and removed ones are forgotten.

use crate::errors::{GuardError, Result};
use crate::features::file_watcher::ports::WriteObserver;
use dashmap::DashMap;
use notify::event::{ModifyKind, RemoveKind};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Shared {
    watcher: Mutex<Option<RecommendedWatcher>>,
    registrations: DashMap<PathBuf, Instant>,
    running: AtomicBool,
    extension: String,
    observer: Arc<dyn WriteObserver>,
}

/// Watches a directory tree and forwards document writes to a `WriteObserver`
///
/// # Example
/// ```ignore
/// let mut tree = WatchTree::new("nbt", scheduler.clone())?;
/// tree.register(&paths.uploaded_dir)?;
/// tree.start()?;
/// ```
pub struct WatchTree {
    shared: Arc<Shared>,
    event_rx: Option<Receiver<notify::Result<Event>>>,
    watch_thread: Option<thread::JoinHandle<()>>,
}

impl WatchTree {
    pub fn new(extension: impl Into<String>, observer: Arc<dyn WriteObserver>) -> Result<Self> {
        let (event_tx, event_rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.send(res);
            },
            NotifyConfig::default(),
        )?;

        Ok(Self {
            shared: Arc::new(Shared {
                watcher: Mutex::new(Some(watcher)),
                registrations: DashMap::new(),
                running: AtomicBool::new(false),
                extension: extension.into(),
                observer,
            }),
            event_rx: Some(event_rx),
            watch_thread: None,
        })
    }

    /// Register `root` and every directory below it.
    ///
    /// # Errors
    /// `GuardError::Io` if the root is missing or not a directory,
    /// `GuardError::Watch` if the OS refuses a registration.
    pub fn register(&self, root: &Path) -> Result<()> {
        let meta = std::fs::metadata(root)
            .map_err(|e| GuardError::io(format!("watch {}", root.display()), e))?;
        if !meta.is_dir() {
            return Err(GuardError::io(
                format!("watch {}", root.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        self.shared.register_tree(root)
    }

    pub fn is_registered(&self, dir: &Path) -> bool {
        self.shared.registrations.contains_key(dir)
    }

    pub fn registration_count(&self) -> usize {
        self.shared.registrations.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Spawn the dedicated watch thread
    pub fn start(&mut self) -> Result<()> {
        let event_rx = self.event_rx.take().ok_or_else(|| {
            GuardError::io(
                "start watch thread",
                io::Error::new(io::ErrorKind::Other, "watch tree already started"),
            )
        })?;

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("schematic-watch".to_string())
            .spawn(move || shared.run(event_rx))
            .map_err(|e| GuardError::io("spawn watch thread", e))?;
        self.watch_thread = Some(handle);
        Ok(())
    }

    /// Stop the watch thread and release every registration. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        // Dropping the watcher closes the event channel
        self.shared.watcher.lock().take();
        self.shared.registrations.clear();

        if let Some(handle) = self.watch_thread.take() {
            if handle.join().is_err() {
                tracing::warn!("Watch thread panicked");
            }
        }
    }
}

impl Drop for WatchTree {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn run(&self, event_rx: Receiver<notify::Result<Event>>) {
        tracing::debug!("Watch thread started");
        while self.running.load(Ordering::SeqCst) {
            match event_rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    self.handle_event(event);
                    if self.registrations.is_empty() {
                        tracing::info!("Upload directory removed, watcher exiting");
                        self.running.store(false, Ordering::SeqCst);
                    }
                }
                Ok(Err(e)) => tracing::debug!("Watch error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("Watch thread stopped");
    }

    fn handle_event(&self, event: Event) {
        // Overflow: the OS dropped events. Nothing is assumed processed.
        if event.need_rescan() {
            tracing::debug!("Watch queue overflowed, events dropped");
            return;
        }

        match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                for path in &event.paths {
                    if path.is_dir() {
                        self.register_new_dir(path);
                    } else {
                        self.forward(path);
                    }
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) | EventKind::Any => {
                for path in &event.paths {
                    self.forward(path);
                }
            }
            EventKind::Remove(RemoveKind::File) => {}
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.forget(path);
                }
            }
            _ => {}
        }
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    fn forward(&self, path: &Path) {
        if !self.is_document(path) {
            return;
        }
        let Some(submitter) = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            return;
        };
        self.observer
            .observe(path.to_path_buf(), submitter, Instant::now());
    }

    fn register_tree(&self, root: &Path) -> Result<()> {
        for entry in WalkDir::new(root).into_iter().filter_entry(|e| e.file_type().is_dir()) {
            let entry = entry.map_err(|e| {
                let context = format!("walk {}", root.display());
                match e.into_io_error() {
                    Some(io_err) => GuardError::io(context, io_err),
                    None => GuardError::io(context, io::Error::new(io::ErrorKind::Other, "walk failed")),
                }
            })?;
            self.register_dir(entry.path())?;
        }
        Ok(())
    }

    fn register_dir(&self, dir: &Path) -> Result<()> {
        if self.registrations.contains_key(dir) {
            return Ok(());
        }
        let mut watcher = self.watcher.lock();
        let Some(watcher) = watcher.as_mut() else {
            return Ok(());
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        self.registrations.insert(dir.to_path_buf(), Instant::now());
        tracing::debug!("Watching {}", dir.display());
        Ok(())
    }

    /// A directory appeared after startup. Files may already have landed in
    /// it before the registration went live, so forward those too.
    fn register_new_dir(&self, dir: &Path) {
        if let Err(e) = self.register_tree(dir) {
            tracing::warn!("Failed to watch new directory {}: {}", dir.display(), e);
            return;
        }
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                self.forward(entry.path());
            }
        }
    }

    fn forget(&self, path: &Path) {
        let removed: Vec<PathBuf> = self
            .registrations
            .iter()
            .filter(|r| r.key().starts_with(path))
            .map(|r| r.key().clone())
            .collect();
        if removed.is_empty() {
            return;
        }

        let mut watcher = self.watcher.lock();
        for dir in removed {
            self.registrations.remove(&dir);
            if let Some(watcher) = watcher.as_mut() {
                // The OS usually dropped it already
                let _ = watcher.unwatch(&dir);
            }
            tracing::debug!("Stopped watching {}", dir.display());
        }
    }
}
