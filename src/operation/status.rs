//! Lifecycle status of an asynchronous operation.

use std::fmt;

/// Status of an asynchronous operation.
///
/// An operation starts in `Running` and ends in exactly one of the three
/// terminal states. Transitions are monotonic: once a terminal state is
/// reached, `status()` never reports `Running` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The work has been started and has not reached a terminal state.
    Running,
    /// The work produced a result.
    Completed,
    /// The work failed with an error.
    Faulted,
    /// The work was canceled before a result was committed.
    Canceled,
}

impl Status {
    /// Whether this status is terminal (no further transitions occur).
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Faulted => "faulted",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}
