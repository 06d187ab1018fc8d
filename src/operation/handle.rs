//! A single run of cancellable, progress-reporting asynchronous work.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::error::{BoxError, Canceled, OperationError, SharedError};
use crate::operation::completion::{CompletionCell, Outcome};
use crate::operation::progress::{ProgressReporter, ProgressSlot};
use crate::operation::{CancelSignal, Status};

/// Process-wide operation id counter. Atomic, so concurrent construction
/// yields unique ids.
static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Completion observer installed on an operation.
type CompletedHandler = Box<dyn FnOnce(Status) + Send>;

struct CompletedSlot {
    handler: Option<CompletedHandler>,
    /// Whether the terminal notification has already been dispatched.
    /// Handlers assigned afterwards fire immediately.
    notified: bool,
}

struct Inner<R, P: 'static> {
    id: u64,
    completion: CompletionCell<R>,
    cancel: CancelSignal,
    progress: Arc<ProgressSlot<P>>,
    completed: Mutex<CompletedSlot>,
}

impl<R, P: 'static> Inner<R, P> {
    /// Commit the worker's outcome. Runs exactly once, on every exit path
    /// of the factory future.
    fn commit(&self, result: Result<R, BoxError>) {
        // Progress delivery stops before the terminal state lands, so no
        // observer sees a report after the completion callback has run.
        self.progress.close();

        // Commit-time precedence: a cancellation requested before the
        // result is committed wins, even over a produced value. A value
        // committed before any cancel request stands.
        let outcome = if self.cancel.is_canceled() {
            Outcome::Canceled
        } else {
            match result {
                Ok(value) => Outcome::Value(value),
                Err(err) if err.downcast_ref::<Canceled>().is_some() => Outcome::Canceled,
                Err(err) => Outcome::Fault(Arc::from(err)),
            }
        };

        let status = outcome.status();
        if self.completion.set(outcome).is_err() {
            // The cell is written only from this worker
            debug!("operation {} was already settled", self.id);
            return;
        }
        debug!("operation {} settled as {}", self.id, status);

        let handler = {
            let mut slot = self.completed.lock();
            slot.notified = true;
            slot.handler.take()
        };
        if let Some(handler) = handler {
            handler(status);
        }
    }
}

/// Handle to a single run of cancellable, progress-reporting work.
///
/// Constructing an `AsyncOperation` starts the work immediately on the
/// tokio runtime; there is no separate start step. The handle owns a
/// set-once completion cell, a cooperative [`CancelSignal`], and two
/// rebindable observer slots (progress and completion). The operation
/// runs to its terminal state even if the handle is dropped.
///
/// # Terminal states
///
/// Exactly one of three paths settles the operation: the factory future
/// resolves with a value (`Completed`), resolves with an error
/// (`Faulted`), or cancellation wins (`Canceled`). The completion
/// observer fires exactly once regardless of path. Cancellation requested
/// before the result is committed takes precedence over the factory's own
/// outcome; once a value or fault is committed, a later `cancel()` does
/// not change it.
///
/// # Panics
///
/// Construction must happen inside a tokio runtime, as the factory future
/// is spawned on it.
pub struct AsyncOperation<R, P: 'static> {
    inner: Arc<Inner<R, P>>,
}

impl<R, P: 'static> AsyncOperation<R, P> {
    /// Start new work.
    ///
    /// The factory receives a [`ProgressReporter`] for publishing progress
    /// and a [`CancelSignal`] it is expected to observe. The returned
    /// future is spawned immediately; the constructor does not wait for it.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(ProgressReporter<P>, CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
        R: Send + 'static,
        P: Send + 'static,
    {
        let id = NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::new(Inner {
            id,
            completion: CompletionCell::new(),
            cancel: CancelSignal::new(),
            progress: Arc::new(ProgressSlot::new()),
            completed: Mutex::new(CompletedSlot {
                handler: None,
                notified: false,
            }),
        });

        let reporter = ProgressReporter::new(Arc::clone(&inner.progress));
        let signal = inner.cancel.clone();
        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            trace!("operation {} running", worker.id);
            let result = factory(reporter, signal).await;
            worker.commit(result);
        });

        Self { inner }
    }

    /// Process-unique identifier assigned at construction.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Request cancellation. Idempotent and cooperative: the running work
    /// must observe the signal; ignored, the work runs to natural
    /// completion (subject to the commit-time precedence rule).
    pub fn cancel(&self) {
        debug!("operation {} cancel requested", self.inner.id);
        self.inner.cancel.cancel();
    }

    /// Release observer resources. A no-op hook reserved for extension;
    /// safe to call any number of times.
    pub fn close(&self) {}

    /// Current status, derived rather than stored.
    ///
    /// Cancellation takes precedence while running: a requested cancel
    /// reports `Canceled` even before the work has observed the signal.
    pub fn status(&self) -> Status {
        match self.inner.completion.peek_status() {
            Some(status) => status,
            None if self.inner.cancel.is_canceled() => Status::Canceled,
            None => Status::Running,
        }
    }

    /// The captured failure, if the operation faulted.
    pub fn error(&self) -> Option<SharedError> {
        self.inner.completion.fault()
    }

    /// Wait for the terminal state and read the result.
    ///
    /// Returns the success value, or [`OperationError::Faulted`] with the
    /// captured error, or [`OperationError::Canceled`].
    pub async fn get_results(&self) -> Result<R, OperationError>
    where
        R: Clone,
    {
        self.inner.completion.wait().await
    }

    /// Install the progress observer. Last write wins; the observer
    /// receives only reports made after it was installed, and none once
    /// the operation is terminal.
    pub fn set_progress(&self, observer: impl FnMut(P) + Send + 'static) {
        self.inner.progress.set(Box::new(observer));
    }

    /// Install the completion observer. Last write wins.
    ///
    /// The handler fires exactly once with the terminal status. If the
    /// operation is already terminal at assignment time, the handler is
    /// invoked immediately, so late subscribers never miss the notification.
    pub fn set_completed(&self, handler: impl FnOnce(Status) + Send + 'static) {
        let mut slot = self.inner.completed.lock();
        if slot.notified {
            let status = self.status();
            drop(slot);
            handler(status);
        } else {
            slot.handler = Some(Box::new(handler));
        }
    }
}
