//! Infrastructure - notify registrations, tokio timers, host queues

mod debounce;
mod host;
mod watch_tree;


pub use debounce::{DebounceScheduler, Readiness};
pub use host::{HostLoop, ImmediateExecutor, SerialExecutor};
pub use watch_tree::WatchTree;
