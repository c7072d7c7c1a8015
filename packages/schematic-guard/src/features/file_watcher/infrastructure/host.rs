//! Host execution contexts

use crate::features::file_watcher::ports::{HostExecutor, HostTask};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Runs every task inline on the submitting thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl HostExecutor for ImmediateExecutor {
    fn submit(&self, task: HostTask) {
        task();
    }
}

/// FIFO queue feeding a single consumer (`HostLoop`)
///
/// Submissions after `close()` are dropped.
pub struct SerialExecutor {
    tx: Mutex<Option<Sender<HostTask>>>,
}

/// Consumer side of a `SerialExecutor`, run on the host's own thread
pub struct HostLoop {
    rx: Receiver<HostTask>,
}

impl SerialExecutor {
    pub fn new() -> (Self, HostLoop) {
        let (tx, rx) = channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            HostLoop { rx },
        )
    }

    /// Stop accepting tasks. The loop drains what is queued, then returns.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl HostExecutor for SerialExecutor {
    fn submit(&self, task: HostTask) {
        match self.tx.lock().as_ref() {
            Some(tx) => {
                if tx.send(task).is_err() {
                    tracing::debug!("Host loop is gone, dropping task");
                }
            }
            None => tracing::debug!("Host executor closed, dropping task"),
        }
    }
}

impl HostLoop {
    /// Run tasks until the executor is closed and the queue is empty
    pub fn run(&self) {
        while let Ok(task) = self.rx.recv() {
            run_task(task);
        }
        tracing::debug!("Host loop finished");
    }

    /// Run queued tasks for up to `timeout` of idle waiting.
    /// Returns how many ran, or `None` once the executor is closed and drained.
    pub fn run_for(&self, timeout: Duration) -> Option<usize> {
        let mut ran = 0;
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(task) => {
                    run_task(task);
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => return Some(ran),
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Run whatever is queued right now without waiting
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            run_task(task);
            ran += 1;
        }
        ran
    }
}

/// A panicking task must not take the host loop down with it
fn run_task(task: HostTask) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::error!("Host task panicked");
    }
}
