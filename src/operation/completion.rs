//! Set-once completion cell holding the terminal outcome of an operation.

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{CommandError, OperationError, SharedError};
use crate::operation::Status;

/// Terminal outcome committed into a [`CompletionCell`].
#[derive(Debug, Clone)]
pub(crate) enum Outcome<T> {
    /// The work produced a value.
    Value(T),
    /// The work failed with the captured error.
    Fault(SharedError),
    /// The work was canceled before a value was committed.
    Canceled,
}

impl<T> Outcome<T> {
    pub(crate) fn status(&self) -> Status {
        match self {
            Self::Value(_) => Status::Completed,
            Self::Fault(_) => Status::Faulted,
            Self::Canceled => Status::Canceled,
        }
    }
}

/// Holds exactly one of {value, error, canceled}, settable exactly once.
///
/// Readers await the settled flag; a second `set` is a programming error
/// and is rejected with [`CommandError::AlreadyCompleted`].
pub(crate) struct CompletionCell<T> {
    slot: Mutex<Option<Outcome<T>>>,
    settled_tx: watch::Sender<bool>,
    settled_rx: watch::Receiver<bool>,
}

impl<T> CompletionCell<T> {
    pub(crate) fn new() -> Self {
        let (settled_tx, settled_rx) = watch::channel(false);
        Self {
            slot: Mutex::new(None),
            settled_tx,
            settled_rx,
        }
    }

    /// Commit the terminal outcome. Exactly-once: a second call fails and
    /// leaves the first outcome in place.
    pub(crate) fn set(&self, outcome: Outcome<T>) -> Result<(), CommandError> {
        {
            let mut slot = self.slot.lock();
            if slot.is_some() {
                return Err(CommandError::AlreadyCompleted);
            }
            *slot = Some(outcome);
        }
        let _ = self.settled_tx.send(true);
        Ok(())
    }

    /// Status of the committed outcome, or `None` while unsettled.
    pub(crate) fn peek_status(&self) -> Option<Status> {
        self.slot.lock().as_ref().map(Outcome::status)
    }

    /// The captured fault, if the cell settled as one.
    pub(crate) fn fault(&self) -> Option<SharedError> {
        match self.slot.lock().as_ref() {
            Some(Outcome::Fault(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// Wait until the cell is settled.
    pub(crate) async fn settled(&self) {
        let mut rx = self.settled_rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // Sender lives in this cell; unreachable while self is borrowed
                return;
            }
            if *rx.borrow() {
                return;
            }
        }
    }

    /// Wait for the terminal outcome and read it.
    pub(crate) async fn wait(&self) -> Result<T, OperationError>
    where
        T: Clone,
    {
        self.settled().await;
        match self.slot.lock().as_ref() {
            Some(Outcome::Value(value)) => Ok(value.clone()),
            Some(Outcome::Fault(err)) => Err(OperationError::Faulted(err.clone())),
            Some(Outcome::Canceled) | None => Err(OperationError::Canceled),
        }
    }
}
