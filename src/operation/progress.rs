//! Progress relay between a running computation and its current observer.

use std::sync::Arc;

use parking_lot::Mutex;

/// Observer callback installed on an operation.
pub(crate) type ProgressObserver<P> = Box<dyn FnMut(P) + Send>;

struct SlotState<P: 'static> {
    observer: Option<ProgressObserver<P>>,
    closed: bool,
}

/// Rebindable observer slot shared by an operation and its reporter.
///
/// Each `report` reads the currently registered observer under the slot
/// lock, so rebinding races cleanly with in-flight reports: a report is
/// delivered to whichever observer was registered at call time. Closing
/// the slot (done by the worker before the terminal state lands) takes
/// the same lock, which guarantees no report is delivered after `close`
/// returns.
pub(crate) struct ProgressSlot<P: 'static> {
    state: Mutex<SlotState<P>>,
}

impl<P: 'static> ProgressSlot<P> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                observer: None,
                closed: false,
            }),
        }
    }

    /// Replace the observer. Last write wins; an observer installed after
    /// the slot closed never fires.
    pub(crate) fn set(&self, observer: ProgressObserver<P>) {
        self.state.lock().observer = Some(observer);
    }

    /// Stop delivery. Reports arriving after this returns are dropped.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.observer = None;
    }

    fn report(&self, value: P) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if let Some(observer) = state.observer.as_mut() {
            observer(value);
        }
    }
}

/// Producer-side handle for reporting progress from inside a running
/// computation.
///
/// Handed to the operation factory alongside the cancel signal. Reports
/// are forwarded, in call order, to whichever observer the operation
/// owner currently has registered; reports made once the operation is
/// terminal are dropped. The observer runs on the reporting task, so
/// callbacks should stay short and must not install observers on the
/// same operation from inside the callback.
pub struct ProgressReporter<P: 'static> {
    slot: Arc<ProgressSlot<P>>,
}

impl<P: 'static> ProgressReporter<P> {
    pub(crate) fn new(slot: Arc<ProgressSlot<P>>) -> Self {
        Self { slot }
    }

    /// Deliver a progress value to the current observer, if any.
    pub fn report(&self, value: P) {
        self.slot.report(value);
    }
}

impl<P: 'static> Clone for ProgressReporter<P> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}
