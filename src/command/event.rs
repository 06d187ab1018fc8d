//! State-change notifications broadcast by commands.
//!
//! Commands publish over `tokio::sync::broadcast` channels. Subscribe
//! before calling `execute` to observe the full lifecycle of a run; a
//! lagging receiver drops the oldest events, never blocks the command.

use crate::error::SharedError;

/// Broadcast buffer depth for command event channels.
pub(crate) const EVENT_CAPACITY: usize = 32;

/// One batched snapshot of a command's observable state, published when
/// an execution finishes.
///
/// Result, error, executing, and executable land in a single event rather
/// than four racing notifications.
#[derive(Debug, Clone)]
pub struct CompletionSnapshot<R> {
    /// The execution's result, if it succeeded.
    pub result: Option<R>,
    /// The execution's failure, if it did not.
    pub error: Option<SharedError>,
    /// Whether an execution is in flight (always `false` in a completion
    /// snapshot; the slot is cleared before publishing).
    pub is_executing: bool,
    /// The delegate's parameter-free `can_execute` answer at completion
    /// time.
    pub is_executable: bool,
}

/// Notifications published by an [`AsyncCommand`](crate::AsyncCommand).
#[derive(Debug, Clone)]
pub enum CommandEvent<R> {
    /// The computed `can_execute` value changed since it was last
    /// computed.
    CanExecuteChanged(bool),
    /// An execution finished, with one batched state snapshot.
    Completed(CompletionSnapshot<R>),
}

/// Notifications published by an
/// [`AsyncCommandWithProgress`](crate::AsyncCommandWithProgress), in
/// addition to the inner command's [`CommandEvent`]s.
#[derive(Debug, Clone)]
pub enum ProgressEvent<R, P> {
    /// The in-flight operation reported a progress value.
    Progress(P),
    /// The in-flight operation produced its final result.
    Result(R),
}
