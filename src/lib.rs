//! # async_command
//!
//! Cancellable, progress-reporting asynchronous operations and the
//! command wrappers that bind them to observable state.
//!
//! The crate provides two layers:
//!
//! - [`AsyncOperation`]: a single run of work, started at construction,
//!   cooperatively cancellable, reporting progress to a rebindable
//!   observer and settling exactly once into one of three terminal
//!   states. [`OperationAdapter`] reshapes an operation's result and
//!   progress types through pure converter functions.
//! - [`AsyncCommand`]: a single-flight command around a
//!   [`CommandDelegate`], publishing batched state-change events.
//!   [`AsyncCommandWithProgress`] composes both layers and adds a
//!   cancel sub-command.
//!
//! Everything runs on the tokio runtime. No thread affinity is assumed;
//! callers that need continuations on a particular thread marshal them
//! from the event streams themselves.
//!
//! ## Example
//!
//! ```rust
//! use async_command::{AsyncCommand, BoxError, CommandEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let command = AsyncCommand::from_fn(|parameter: Option<u32>| async move {
//!     Ok::<_, BoxError>(parameter.unwrap_or(0) + 1)
//! });
//!
//! let mut events = command.subscribe();
//! command.execute(Some(41)).expect("command is idle");
//!
//! match events.recv().await.expect("command publishes completion") {
//!     CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(42)),
//!     other => panic!("unexpected event: {other:?}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod command;
pub mod error;
pub mod operation;

pub use command::{
    AsyncCommand, AsyncCommandWithProgress, CancelCommand, CommandDelegate, CommandEvent,
    CompletionSnapshot, FnDelegate, ProgressEvent,
};
pub use error::{BoxError, Canceled, CommandError, OperationError, SharedError};
pub use operation::{AsyncOperation, CancelSignal, OperationAdapter, ProgressReporter, Status};
