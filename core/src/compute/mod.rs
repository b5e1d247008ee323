//! Background job primitives.
//!
//! - [`TaskHandle`]: Channel-based handle for a job's result
//! - [`TaskRunner`]: Trait for running blocking jobs off the caller's thread
//! - [`ThreadRunner`]: Spawns one OS thread per job
//! - [`InlineRunner`]: Runs the job on the calling thread

mod task_handle;

pub use task_handle::{TaskHandle, TaskPoll};

use std::sync::mpsc;

/// Trait for running blocking jobs (image decoding, file reads).
///
/// Results are delivered via [`TaskHandle`], which can be checked from a
/// frame loop with [`TaskHandle::poll_result`].
///
/// Not object-safe due to generic methods. There is typically one
/// concrete implementation per application, plus test doubles.
pub trait TaskRunner: Clone + Send + Sync + 'static {
    /// Starts `job` and returns a handle to its eventual result.
    fn run<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static;
}

/// Runs each job on a freshly spawned OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRunner;

impl TaskRunner for ThreadRunner {
    fn run<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("mugprint-task".into())
            .spawn(move || {
                // The handle may have been dropped; nothing to report then.
                let _ = tx.send(job());
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn task thread: {}", e);
        }
        TaskHandle::new(rx)
    }
}

/// Runs each job to completion before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl TaskRunner for InlineRunner {
    fn run<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        TaskHandle::ready(job())
    }
}
