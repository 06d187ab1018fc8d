//! Cooperative cancellation signal.

use tokio::sync::watch;

use crate::error::{BoxError, Canceled};

/// Cooperative cancellation signal shared between an operation and the
/// work it runs.
///
/// Wraps a `tokio::sync::watch` channel. Cancellation is a request, not a
/// preemption: the running computation must observe the signal (by
/// polling [`is_canceled`](Self::is_canceled) or [`check`](Self::check),
/// or by awaiting [`canceled`](Self::canceled)) and terminate early.
/// Work that ignores the signal runs to natural completion.
///
/// Clone-friendly: the operation and its factory each hold a copy.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Create a new, not-yet-canceled signal.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Request cancellation. Idempotent; repeat calls are safe.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Return `Err(Canceled)` once cancellation has been requested.
    ///
    /// The polling helper for cooperative work: `signal.check()?` at each
    /// natural pause point.
    pub fn check(&self) -> Result<(), BoxError> {
        if self.is_canceled() {
            Err(Canceled.into())
        } else {
            Ok(())
        }
    }

    /// Wait until cancellation is requested.
    ///
    /// Resolves immediately if already canceled.
    pub async fn canceled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // Sender dropped; treat as canceled
                return;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
