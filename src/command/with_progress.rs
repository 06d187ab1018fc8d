//! Command variant that surfaces progress and supports cancellation.

use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use log::debug;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::command::delegate::CommandDelegate;
use crate::command::event::{CommandEvent, ProgressEvent, EVENT_CAPACITY};
use crate::command::AsyncCommand;
use crate::error::{BoxError, CommandError, SharedError};
use crate::operation::{AsyncOperation, CancelSignal, ProgressReporter};

type GuardFn<Param> = Box<dyn Fn(Option<&Param>) -> bool + Send + Sync>;
type WorkFactory<Param, R, P> = Arc<
    dyn Fn(Option<Param>, ProgressReporter<P>, CancelSignal) -> BoxFuture<'static, Result<R, BoxError>>
        + Send
        + Sync,
>;

/// State shared between the command, its delegate, and the cancel
/// sub-command.
struct ProgressShared<R: 'static, P: 'static> {
    /// The operation backing the in-flight execution. `None` when idle.
    operation: Mutex<Option<Arc<AsyncOperation<R, P>>>>,
    current_progress: Mutex<Option<P>>,
    final_result: Mutex<Option<R>>,
    events: broadcast::Sender<ProgressEvent<R, P>>,
}

/// Delegate specialization that runs each execution through an
/// [`AsyncOperation`], wiring progress and the cancel sub-command.
struct ProgressDelegate<Param: 'static, R: 'static, P: 'static> {
    can_execute: GuardFn<Param>,
    factory: WorkFactory<Param, R, P>,
    shared: Arc<ProgressShared<R, P>>,
}

#[async_trait]
impl<Param, R, P> CommandDelegate<Param, R> for ProgressDelegate<Param, R, P>
where
    Param: Send + 'static,
    R: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    fn can_execute(&self, parameter: Option<&Param>) -> bool {
        (self.can_execute)(parameter)
    }

    async fn execute(&self, parameter: Option<Param>) -> Result<R, BoxError> {
        let shared = Arc::clone(&self.shared);
        *shared.current_progress.lock() = None;
        *shared.final_result.lock() = None;

        let factory = Arc::clone(&self.factory);
        let operation = Arc::new(AsyncOperation::new(move |reporter, signal| {
            (*factory)(parameter, reporter, signal)
        }));

        let observer_shared = Arc::clone(&shared);
        operation.set_progress(move |value: P| {
            *observer_shared.current_progress.lock() = Some(value.clone());
            let _ = observer_shared.events.send(ProgressEvent::Progress(value));
        });

        *shared.operation.lock() = Some(Arc::clone(&operation));

        let result = operation.get_results().await;

        // The cancel sub-command goes dormant on every outcome.
        *shared.operation.lock() = None;

        match result {
            Ok(value) => {
                *shared.final_result.lock() = Some(value.clone());
                let _ = shared.events.send(ProgressEvent::Result(value.clone()));
                Ok(value)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// An [`AsyncCommand`] whose executions run through an
/// [`AsyncOperation`], exposing progress values and a cancel
/// sub-command.
///
/// Exactly one operation is live per command at a time, enforced by the
/// enclosing command's single-flight rule. The command owns the
/// operation for the duration of the execution; the cancel sub-command
/// only looks it up through a weak reference and never keeps it alive.
pub struct AsyncCommandWithProgress<Param: 'static, R: 'static, P: 'static> {
    command: AsyncCommand<Param, R>,
    shared: Arc<ProgressShared<R, P>>,
}

impl<Param, R, P> AsyncCommandWithProgress<Param, R, P>
where
    Param: Send + 'static,
    R: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    /// Build an always-executable command from a progress-producing work
    /// factory.
    ///
    /// Per execution the factory receives the command parameter, a
    /// [`ProgressReporter`], and the operation's [`CancelSignal`].
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(Option<Param>, ProgressReporter<P>, CancelSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self::with_can_execute(|_| true, factory)
    }

    /// Build a command with an explicit `can_execute` guard.
    pub fn with_can_execute<C, F, Fut>(can_execute: C, factory: F) -> Self
    where
        C: Fn(Option<&Param>) -> bool + Send + Sync + 'static,
        F: Fn(Option<Param>, ProgressReporter<P>, CancelSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(ProgressShared {
            operation: Mutex::new(None),
            current_progress: Mutex::new(None),
            final_result: Mutex::new(None),
            events,
        });
        let delegate = ProgressDelegate {
            can_execute: Box::new(can_execute),
            factory: Arc::new(move |parameter, reporter, signal| {
                factory(parameter, reporter, signal).boxed()
            }),
            shared: Arc::clone(&shared),
        };
        Self {
            command: AsyncCommand::new(delegate),
            shared,
        }
    }

    /// Start an execution. See [`AsyncCommand::execute`].
    pub fn execute(&self, parameter: Option<Param>) -> Result<(), CommandError> {
        self.command.execute(parameter)
    }

    /// Whether the command may run. See [`AsyncCommand::can_execute`].
    pub fn can_execute(&self, parameter: Option<&Param>) -> bool {
        self.command.can_execute(parameter)
    }

    /// Whether an execution is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.command.is_executing()
    }

    /// Result of the most recent execution, if it succeeded.
    pub fn result(&self) -> Option<R> {
        self.command.result()
    }

    /// Failure of the most recent execution, if any. A canceled
    /// execution surfaces here as
    /// [`OperationError::Canceled`](crate::OperationError::Canceled).
    pub fn error(&self) -> Option<SharedError> {
        self.command.error()
    }

    /// Latest progress value observed for the in-flight (or most recent)
    /// execution. Reset when a new execution starts.
    pub fn current_progress(&self) -> Option<P> {
        self.shared.current_progress.lock().clone()
    }

    /// Terminal result of the most recent execution. Reset when a new
    /// execution starts.
    pub fn final_result(&self) -> Option<R> {
        self.shared.final_result.lock().clone()
    }

    /// The sub-command that cancels the in-flight operation.
    pub fn cancel_command(&self) -> CancelCommand<R, P> {
        CancelCommand {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Subscribe to the inner command's state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent<R>> {
        self.command.subscribe()
    }

    /// Subscribe to progress and result notifications.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent<R, P>> {
        self.shared.events.subscribe()
    }
}

/// Cancels the operation currently backing an
/// [`AsyncCommandWithProgress`] execution.
///
/// Holds only a weak reference to the command's shared state: it can
/// neither outlive the command usefully nor keep an operation alive.
pub struct CancelCommand<R: 'static, P: 'static> {
    shared: Weak<ProgressShared<R, P>>,
}

impl<R: 'static, P: 'static> CancelCommand<R, P> {
    /// True iff an operation is currently in flight.
    pub fn can_execute(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.operation.lock().is_some())
    }

    /// Cancel the in-flight operation.
    pub fn execute(&self) -> Result<(), CommandError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or(CommandError::NoActiveOperation)?;
        let operation = shared.operation.lock().clone();
        match operation {
            Some(operation) => {
                debug!("cancel command fired for operation {}", operation.id());
                operation.cancel();
                Ok(())
            }
            None => Err(CommandError::NoActiveOperation),
        }
    }
}

impl<R: 'static, P: 'static> Clone for CancelCommand<R, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}
