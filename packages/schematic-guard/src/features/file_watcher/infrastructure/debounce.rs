//! DebounceScheduler - settle detection for streamed uploads
//!
//! One pending entry per path holds the latest write observation. The first
//! observation arms a timer task; later ones only move the timestamp. When
//! the timer fires, the entry is removed only if it is still older than the
//! interval (`DashMap::remove_if`), so a check can never declare a file
//! ready while a newer observation is waiting.

use crate::errors::{GuardError, Result};
use crate::features::file_watcher::ports::{ReadyFileHandler, WriteObserver};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};

const DEBOUNCE_WORKERS: usize = 2;

#[derive(Debug, Clone)]
struct PendingWrite {
    last_seen: Instant,
    submitter: String,
}

/// Result of one readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Settled; pending state cleared, dispatch now
    Ready { submitter: String },
    /// A newer observation exists; check again after another interval
    Pending,
    /// Nothing to do (file gone, or already dispatched)
    Cleared,
}

struct Inner {
    pending: DashMap<PathBuf, PendingWrite>,
    interval: Duration,
    handler: Arc<dyn ReadyFileHandler>,
}

pub struct DebounceScheduler {
    inner: Arc<Inner>,
    runtime: Mutex<Option<Runtime>>,
}

impl DebounceScheduler {
    pub fn new(interval: Duration, handler: Arc<dyn ReadyFileHandler>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(DEBOUNCE_WORKERS)
            .thread_name("schematic-debounce")
            .enable_time()
            .build()
            .map_err(|e| GuardError::io("start debounce pool", e))?;

        Ok(Self {
            inner: Arc::new(Inner {
                pending: DashMap::new(),
                interval,
                handler,
            }),
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.inner.pending.contains_key(path)
    }

    /// Record a write observation; arms a timer only for a new pending path
    pub fn notify(&self, path: PathBuf, submitter: String, seen_at: Instant) {
        let runtime = self.runtime.lock();
        let Some(runtime) = runtime.as_ref() else {
            tracing::debug!("Debounce pool stopped, ignoring {}", path.display());
            return;
        };

        let arm = match self.inner.pending.entry(path.clone()) {
            Entry::Occupied(mut entry) => {
                let pending = entry.get_mut();
                pending.last_seen = pending.last_seen.max(seen_at);
                pending.submitter = submitter;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(PendingWrite {
                    last_seen: seen_at,
                    submitter,
                });
                true
            }
        };

        if arm {
            let inner = self.inner.clone();
            runtime.spawn(async move {
                loop {
                    tokio::time::sleep(inner.interval).await;
                    match inner.check_ready_at(&path, Instant::now()) {
                        Readiness::Ready { submitter } => {
                            tracing::debug!("{} settled, dispatching", path.display());
                            inner.handler.on_ready(path, submitter);
                            break;
                        }
                        Readiness::Pending => continue,
                        Readiness::Cleared => break,
                    }
                }
            });
        }
    }

    pub fn check_ready(&self, path: &Path) -> Readiness {
        self.inner.check_ready_at(path, Instant::now())
    }

    /// Readiness as of `now`; exposed for tests that back-date observations
    pub fn check_ready_at(&self, path: &Path, now: Instant) -> Readiness {
        self.inner.check_ready_at(path, now)
    }

    /// Drop the pool without waiting for armed timers, and forget pending writes
    pub fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        self.inner.pending.clear();
    }
}

impl Inner {
    fn check_ready_at(&self, path: &Path, now: Instant) -> Readiness {
        let observed = match self.pending.get(path) {
            Some(pending) => pending.last_seen,
            None => return Readiness::Cleared,
        };

        if !path.exists() {
            // Only clear the observation we looked at; a newer one keeps its timer
            return match self
                .pending
                .remove_if(path, |_, pending| pending.last_seen == observed)
            {
                Some(_) => {
                    tracing::debug!("{} vanished before settling", path.display());
                    Readiness::Cleared
                }
                None if self.pending.contains_key(path) => Readiness::Pending,
                None => Readiness::Cleared,
            };
        }

        let interval = self.interval;
        match self.pending.remove_if(path, |_, pending| {
            now.saturating_duration_since(pending.last_seen) >= interval
        }) {
            Some((_, pending)) => Readiness::Ready {
                submitter: pending.submitter,
            },
            None if self.pending.contains_key(path) => Readiness::Pending,
            None => Readiness::Cleared,
        }
    }
}

impl WriteObserver for DebounceScheduler {
    fn observe(&self, path: PathBuf, submitter: String, seen_at: Instant) {
        self.notify(path, submitter, seen_at);
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHandler {
        dispatched: Mutex<Vec<(PathBuf, String, Instant)>>,
    }

    impl ReadyFileHandler for RecordingHandler {
        fn on_ready(&self, path: PathBuf, submitter: String) {
            self.dispatched.lock().push((path, submitter, Instant::now()));
        }
    }

    fn upload(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("house.nbt");
        fs::write(&path, b"payload").unwrap();
        path
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Readiness checks with back-dated observations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn long_interval() -> (DebounceScheduler, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = DebounceScheduler::new(Duration::from_secs(60), handler.clone()).unwrap();
        (scheduler, handler)
    }

    #[test]
    fn test_settled_observation_is_ready() {
        let dir = TempDir::new().unwrap();
        let path = upload(&dir);
        let (scheduler, _) = long_interval();
        let t0 = Instant::now();

        scheduler.notify(path.clone(), "steve".into(), t0);

        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(30)),
            Readiness::Pending
        );
        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(60)),
            Readiness::Ready {
                submitter: "steve".into()
            }
        );
        assert!(!scheduler.is_pending(&path));
        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(61)),
            Readiness::Cleared
        );
    }

    #[test]
    fn test_newer_observation_blocks_readiness() {
        let dir = TempDir::new().unwrap();
        let path = upload(&dir);
        let (scheduler, _) = long_interval();
        let t0 = Instant::now();

        scheduler.notify(path.clone(), "steve".into(), t0);
        scheduler.notify(path.clone(), "steve".into(), t0 + Duration::from_secs(40));

        // Old observation alone would be settled here
        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(60)),
            Readiness::Pending
        );
        assert!(matches!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(100)),
            Readiness::Ready { .. }
        ));
    }

    #[test]
    fn test_out_of_order_observation_does_not_regress() {
        let dir = TempDir::new().unwrap();
        let path = upload(&dir);
        let (scheduler, _) = long_interval();
        let t0 = Instant::now();

        scheduler.notify(path.clone(), "steve".into(), t0 + Duration::from_secs(10));
        scheduler.notify(path.clone(), "steve".into(), t0);

        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(65)),
            Readiness::Pending
        );
    }

    #[test]
    fn test_missing_file_clears_pending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.nbt");
        let (scheduler, _) = long_interval();
        let t0 = Instant::now();

        scheduler.notify(path.clone(), "steve".into(), t0);
        assert_eq!(
            scheduler.check_ready_at(&path, t0 + Duration::from_secs(60)),
            Readiness::Cleared
        );
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_shutdown_clears_and_ignores_new_writes() {
        let dir = TempDir::new().unwrap();
        let path = upload(&dir);
        let (scheduler, _) = long_interval();

        scheduler.notify(path.clone(), "steve".into(), Instant::now());
        scheduler.shutdown();
        assert_eq!(scheduler.pending_count(), 0);

        scheduler.notify(path, "steve".into(), Instant::now());
        assert_eq!(scheduler.pending_count(), 0);
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Real timers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Burst of writes faster than the interval: exactly one dispatch,
    /// no earlier than last write + interval
    #[test]
    fn test_burst_dispatches_once() {
        let dir = TempDir::new().unwrap();
        let path = upload(&dir);
        let handler = Arc::new(RecordingHandler::default());
        let interval = Duration::from_millis(150);
        let scheduler = DebounceScheduler::new(interval, handler.clone()).unwrap();

        let mut last = Instant::now();
        for _ in 0..5 {
            last = Instant::now();
            scheduler.notify(path.clone(), "steve".into(), last);
            thread::sleep(Duration::from_millis(40));
        }

        thread::sleep(Duration::from_millis(600));

        let dispatched = handler.dispatched.lock();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0, path);
        assert_eq!(dispatched[0].1, "steve");
        assert!(dispatched[0].2 >= last + interval);
    }

    #[test]
    fn test_separate_paths_dispatch_independently() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.nbt");
        let b = dir.path().join("b.nbt");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = DebounceScheduler::new(Duration::from_millis(50), handler.clone()).unwrap();

        scheduler.notify(a, "alex".into(), Instant::now());
        scheduler.notify(b, "steve".into(), Instant::now());
        thread::sleep(Duration::from_millis(400));

        assert_eq!(handler.dispatched.lock().len(), 2);
    }
}
