//! Upload Watcher
//!
//! Detects new and rewritten uploads and hands each one off exactly once,
//! after it stops changing:
//! - `WatchTree`: one notify registration per directory, new subtrees picked up live
//! - `DebounceScheduler`: per-path stabilization timers on a small tokio pool
//! - `HostExecutor`: where ready files are actually processed

pub mod infrastructure;
pub mod ports;

pub use infrastructure::{
    DebounceScheduler, HostLoop, ImmediateExecutor, Readiness, SerialExecutor, WatchTree,
};
pub use ports::{HostExecutor, HostTask, ReadyFileHandler, WriteObserver};
