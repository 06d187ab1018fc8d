//! Cancellable, progress-reporting asynchronous operations
//!
//! An [`AsyncOperation`] is a single run of work: constructed from a
//! factory, running immediately, observable through progress and
//! completion callbacks, cooperatively cancellable, and settled exactly
//! once into one of three terminal states. [`OperationAdapter`] wraps an
//! operation to translate its result and progress types without touching
//! its control flow.

pub mod adapter;
pub mod cancel;
mod completion;
pub mod handle;
pub mod progress;
pub mod status;

pub use adapter::OperationAdapter;
pub use cancel::CancelSignal;
pub use handle::AsyncOperation;
pub use progress::ProgressReporter;
pub use status::Status;
