//! Single-flight asynchronous command.

use std::future::Future;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::command::delegate::{CommandDelegate, FnDelegate};
use crate::command::event::{CommandEvent, CompletionSnapshot, EVENT_CAPACITY};
use crate::error::{BoxError, CommandError, SharedError};

struct CommandState<R> {
    /// Handle to the in-flight execution. Presence means "executing";
    /// at most one execution is in flight per command.
    execution: Option<JoinHandle<()>>,
    last_result: Option<R>,
    last_error: Option<SharedError>,
    /// Last computed `can_execute` value, kept to detect changes worth
    /// notifying.
    cached_can_execute: bool,
}

struct CommandInner<P: 'static, R: 'static> {
    delegate: Arc<dyn CommandDelegate<P, R>>,
    state: Mutex<CommandState<R>>,
    events: broadcast::Sender<CommandEvent<R>>,
}

impl<P, R> CommandInner<P, R>
where
    P: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Continuation run when an execution settles, on every outcome:
    /// store result-or-error, clear the execution slot, publish one
    /// batched snapshot.
    fn finish(&self, result: Result<R, BoxError>) {
        let executable = self.delegate.can_execute(None);
        let snapshot = {
            let mut state = self.state.lock();
            match result {
                Ok(value) => state.last_result = Some(value),
                Err(err) => state.last_error = Some(Arc::from(err)),
            }
            state.execution = None;
            state.cached_can_execute = executable;
            CompletionSnapshot {
                result: state.last_result.clone(),
                error: state.last_error.clone(),
                is_executing: false,
                is_executable: executable,
            }
        };
        debug!(
            "command execution finished ({})",
            if snapshot.error.is_some() { "error" } else { "ok" }
        );
        let _ = self.events.send(CommandEvent::Completed(snapshot));
    }
}

/// A command binding an asynchronous action to observable state.
///
/// `execute` starts the delegate's work on the runtime and returns
/// immediately; the outcome lands in [`result`](Self::result) /
/// [`error`](Self::error) and is announced through one batched
/// [`CommandEvent::Completed`]. At most one execution is in flight at a
/// time; the check and the slot reservation happen under one lock, so
/// single-flight holds under concurrent callers.
///
/// Continuations run on the runtime's worker threads; callers needing
/// side effects on a specific thread marshal them from the event stream
/// themselves.
pub struct AsyncCommand<P: 'static, R: 'static> {
    inner: Arc<CommandInner<P, R>>,
}

impl<P, R> AsyncCommand<P, R>
where
    P: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Build a command around a delegate.
    pub fn new(delegate: impl CommandDelegate<P, R> + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CommandInner {
                delegate: Arc::new(delegate),
                state: Mutex::new(CommandState {
                    execution: None,
                    last_result: None,
                    last_error: None,
                    cached_can_execute: false,
                }),
                events,
            }),
        }
    }

    /// Build an always-executable command from a work closure.
    pub fn from_fn<E, Fut>(execute: E) -> Self
    where
        E: Fn(Option<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self::new(FnDelegate::from_fn(execute))
    }

    /// Whether the command may run with the given parameter.
    ///
    /// False whenever an execution is in flight; otherwise the delegate
    /// decides. Not a pure query: when the computed value differs from
    /// the last one, the cache is updated and
    /// [`CommandEvent::CanExecuteChanged`] is emitted.
    pub fn can_execute(&self, parameter: Option<&P>) -> bool {
        let executing = self.inner.state.lock().execution.is_some();
        let computed = !executing && self.inner.delegate.can_execute(parameter);
        let changed = {
            let mut state = self.inner.state.lock();
            if state.cached_can_execute != computed {
                state.cached_can_execute = computed;
                true
            } else {
                false
            }
        };
        if changed {
            let _ = self
                .inner
                .events
                .send(CommandEvent::CanExecuteChanged(computed));
        }
        computed
    }

    /// Start an execution.
    ///
    /// Fails with [`CommandError::AlreadyExecuting`] while one is in
    /// flight and [`CommandError::NotExecutable`] when the delegate
    /// refuses the parameter. Otherwise clears the previous
    /// result/error, reserves the execution slot, and spawns the
    /// delegate's work; the caller is not blocked.
    pub fn execute(&self, parameter: Option<P>) -> Result<(), CommandError> {
        if self.inner.state.lock().execution.is_some() {
            return Err(CommandError::AlreadyExecuting);
        }
        if !self.inner.delegate.can_execute(parameter.as_ref()) {
            return Err(CommandError::NotExecutable);
        }

        // The guard above ran without the lock; re-check and reserve the
        // slot under it so a racing caller cannot also get through.
        let mut state = self.inner.state.lock();
        if state.execution.is_some() {
            return Err(CommandError::AlreadyExecuting);
        }
        state.last_result = None;
        state.last_error = None;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = inner.delegate.execute(parameter).await;
            inner.finish(result);
        });
        state.execution = Some(handle);
        debug!("command execution started");
        Ok(())
    }

    /// Whether an execution is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.inner.state.lock().execution.is_some()
    }

    /// The last computed `can_execute` value.
    pub fn is_executable(&self) -> bool {
        self.inner.state.lock().cached_can_execute
    }

    /// Result of the most recent execution, if it succeeded. Cleared when
    /// a new execution starts.
    pub fn result(&self) -> Option<R> {
        self.inner.state.lock().last_result.clone()
    }

    /// Failure of the most recent execution, if any. Cleared when a new
    /// execution starts.
    pub fn error(&self) -> Option<SharedError> {
        self.inner.state.lock().last_error.clone()
    }

    /// Subscribe to this command's state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent<R>> {
        self.inner.events.subscribe()
    }
}
