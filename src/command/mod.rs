//! Asynchronous commands: single-flight actions with observable state
//!
//! An [`AsyncCommand`] guards a delegate behind a single-flight rule and
//! publishes state changes over a broadcast channel.
//! [`AsyncCommandWithProgress`] runs each execution through an
//! [`AsyncOperation`](crate::AsyncOperation), adding progress values and
//! a cancel sub-command.

pub mod async_command;
pub mod delegate;
pub mod event;
pub mod with_progress;

pub use async_command::AsyncCommand;
pub use delegate::{CommandDelegate, FnDelegate};
pub use event::{CommandEvent, CompletionSnapshot, ProgressEvent};
pub use with_progress::{AsyncCommandWithProgress, CancelCommand};
