use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use std::task::{Context, Poll};

/// Result of a non-blocking check on a [`TaskHandle`].
#[derive(Debug, PartialEq, Eq)]
pub enum TaskPoll<T> {
    /// The job has not finished yet.
    Pending,
    /// The job finished with this value.
    Ready(T),
    /// The job dropped its sender without producing a value (it panicked
    /// or the runner discarded it).
    Lost,
}

/// Handle to a background job's result.
///
/// Result delivery goes through a channel, so the handle can be checked
/// from a frame loop without a real waker.
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Creates a new handle wrapping the given receiver.
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Creates a handle that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(value);
        Self::new(rx)
    }

    /// Checks for the result without blocking.
    ///
    /// A `Ready` value is consumed; later calls report `Lost`.
    pub fn poll_result(&self) -> TaskPoll<T> {
        match self.receiver.try_recv() {
            Ok(val) => TaskPoll::Ready(val),
            Err(mpsc::TryRecvError::Empty) => TaskPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => TaskPoll::Lost,
        }
    }

    /// Blocks until the job completes and returns the result.
    ///
    /// Returns `None` if the sender was dropped without sending.
    pub fn recv(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.receiver.try_recv() {
            Ok(val) => Poll::Ready(Some(val)),
            Err(mpsc::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}
