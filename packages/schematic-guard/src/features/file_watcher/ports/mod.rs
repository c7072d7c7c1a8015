//! Ports - seams between the watcher pieces and their hosts

use std::path::PathBuf;
use std::time::Instant;

/// Unit of work handed to the host execution context
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded execution context owned by the hosting application.
///
/// Tasks run in submission order. `submit` never waits for completion.
pub trait HostExecutor: Send + Sync {
    fn submit(&self, task: HostTask);
}

/// Receives raw write observations from the watch thread
pub trait WriteObserver: Send + Sync {
    fn observe(&self, path: PathBuf, submitter: String, seen_at: Instant);
}

/// Receives paths whose writes have settled
pub trait ReadyFileHandler: Send + Sync {
    fn on_ready(&self, path: PathBuf, submitter: String);
}
