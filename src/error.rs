//! Error types for operations and commands.
//!
//! Two families exist: [`CommandError`] covers synchronous precondition
//! violations surfaced to the immediate caller, and [`OperationError`]
//! covers the terminal failure of an asynchronous operation as seen by
//! its consumers.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error type carried across the crate boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cloneable error handle stored by a settled operation so that every
/// reader can observe the same captured failure.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Sentinel error a cooperative computation returns once it has observed
/// its cancel signal.
///
/// The operation worker maps this to the `Canceled` terminal state instead
/// of `Faulted`. [`CancelSignal::check`](crate::CancelSignal::check)
/// produces it for you.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation canceled")]
pub struct Canceled;

/// Precondition violations raised synchronously by commands and
/// completion cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `execute` was called while an execution is already in flight.
    #[error("command is already executing")]
    AlreadyExecuting,

    /// The delegate refused the parameter at the time `execute` was called.
    #[error("command is not executable for the given parameter")]
    NotExecutable,

    /// The cancel sub-command was invoked with no operation in flight.
    #[error("no operation is currently in flight")]
    NoActiveOperation,

    /// A completion cell was written twice. Operations commit exactly
    /// once, so hitting this indicates a bug in the caller, not a runtime
    /// condition to retry.
    #[error("completion state was already set")]
    AlreadyCompleted,
}

/// Terminal failure of an asynchronous operation, returned by
/// `get_results`.
///
/// Cancellation is a distinct variant rather than a wrapped error payload:
/// callers that check `status()` first never need to inspect it.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// The operation ended in the canceled state.
    #[error("operation canceled")]
    Canceled,

    /// The underlying computation (or a result converter) failed with the
    /// captured error.
    #[error("operation faulted: {0}")]
    Faulted(SharedError),
}

impl OperationError {
    /// Wrap a boxed error as a fault.
    pub fn faulted(error: BoxError) -> Self {
        Self::Faulted(Arc::from(error))
    }

    /// The captured failure, if this is a fault.
    pub fn cause(&self) -> Option<&SharedError> {
        match self {
            Self::Faulted(err) => Some(err),
            Self::Canceled => None,
        }
    }
}
