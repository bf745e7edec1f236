//! Single-fire completion signaling for pending publishes.

use std::sync::Arc;

use tokio::sync::watch;

/// An idempotent, single-fire completion signal.
///
/// The first [`fire`](Self::fire) releases every current and future
/// [`wait`](Self::wait); later fires are no-ops. Clones are handles to the
/// same underlying signal.
#[derive(Debug, Clone)]
pub struct AckSignal {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl AckSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner { tx, rx }),
        }
    }

    /// Fire the signal.
    ///
    /// Returns `true` if this call was the one that fired it, `false` if it
    /// had already fired.
    pub fn fire(&self) -> bool {
        self.inner.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.inner.rx.borrow()
    }

    /// Wait until the signal fires; returns immediately if it already has.
    ///
    /// There is deliberately no timeout here — callers that want one wrap
    /// this future themselves.
    pub async fn wait(&self) {
        let mut rx = self.inner.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender gone without firing; nothing left to wait for.
                return;
            }
        }
    }
}

impl Default for AckSignal {
    fn default() -> Self {
        Self::new()
    }
}
