//! Shared cancellation token for background dispatch tasks.
//!
//! A transport that runs a dispatch task needs a stop signal the task can
//! select against and storage for its `JoinHandle` so shutdown can be
//! awaited. [`ShutdownToken`] bundles both.

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// A cancellation token coordinating shutdown of background tasks.
///
/// Background tasks hold a receiver from [`subscribe`](Self::subscribe) and
/// check it in `tokio::select!` loops; [`signal_stop`](Self::signal_stop)
/// followed by [`join_all`](Self::join_all) performs an orderly stop.
pub struct ShutdownToken {
    /// Sender side of the watch channel; sending `true` signals shutdown.
    stop_tx: watch::Sender<bool>,
    /// Receiver side, cloned for each subscriber.
    stop_rx: watch::Receiver<bool>,
    /// Background task handles to await on shutdown.
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownToken {
    /// Create a new token in the "not stopped" state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            stop_tx,
            stop_rx,
            task_handles: Mutex::new(Vec::new()),
        }
    }

    /// Get a new subscription to the stop signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Check whether the stop signal has been sent.
    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Register a background task handle to await on shutdown.
    pub async fn add_task(&self, handle: JoinHandle<()>) {
        self.task_handles.lock().await.push(handle);
    }

    /// Send the stop signal to all subscribers. Idempotent.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Await all registered background tasks, draining the handle list.
    ///
    /// `JoinError`s (panics, cancellations) are ignored.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
