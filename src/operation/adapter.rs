//! Structural wrapper translating an operation's result/progress types.

use std::sync::Arc;

use crate::error::{BoxError, OperationError, SharedError};
use crate::operation::{AsyncOperation, Status};

type ResultConverter<R, R2> = Arc<dyn Fn(R) -> Result<R2, BoxError> + Send + Sync>;
type ProgressConverter<P, P2> = Arc<dyn Fn(P) -> P2 + Send + Sync>;

/// Consume an [`AsyncOperation<R, P>`] as if it were an
/// `AsyncOperation<R2, P2>`, given pure converter functions.
///
/// Control flow is untouched: cancellation, close, identity, and status
/// delegate straight through to the source; only the result and progress
/// payloads are translated. A failing result converter surfaces as
/// [`OperationError::Faulted`], indistinguishable from a fault in the
/// wrapped computation itself.
pub struct OperationAdapter<R: 'static, P: 'static, R2: 'static, P2: 'static> {
    source: AsyncOperation<R, P>,
    result_converter: ResultConverter<R, R2>,
    progress_converter: ProgressConverter<P, P2>,
}

impl<R: 'static, P: 'static, R2: 'static, P2> OperationAdapter<R, P, R2, P2>
where
    P2: Send + 'static,
{
    /// Wrap `source` with a result converter and a progress converter.
    pub fn new(
        source: AsyncOperation<R, P>,
        result_converter: impl Fn(R) -> Result<R2, BoxError> + Send + Sync + 'static,
        progress_converter: impl Fn(P) -> P2 + Send + Sync + 'static,
    ) -> Self {
        Self {
            source,
            result_converter: Arc::new(result_converter),
            progress_converter: Arc::new(progress_converter),
        }
    }

    /// Install a progress observer on the adapter. Each native progress
    /// event is converted, then forwarded.
    pub fn set_progress(&self, mut observer: impl FnMut(P2) + Send + 'static) {
        let convert = Arc::clone(&self.progress_converter);
        self.source.set_progress(move |value| observer((*convert)(value)));
    }

    /// Install a completion observer. Only terminal statuses are
    /// forwarded; status values themselves are not converted.
    pub fn set_completed(&self, handler: impl FnOnce(Status) + Send + 'static) {
        self.source.set_completed(move |status| {
            if status.is_terminal() {
                handler(status);
            }
        });
    }

    /// Request cancellation on the source operation.
    pub fn cancel(&self) {
        self.source.cancel();
    }

    /// Close the source operation.
    pub fn close(&self) {
        self.source.close();
    }

    /// The source operation's id.
    pub fn id(&self) -> u64 {
        self.source.id()
    }

    /// The source operation's status.
    pub fn status(&self) -> Status {
        self.source.status()
    }

    /// The source operation's captured failure, if any.
    pub fn error(&self) -> Option<SharedError> {
        self.source.error()
    }

    /// Wait for the source result, then apply the result converter.
    pub async fn get_results(&self) -> Result<R2, OperationError>
    where
        R: Clone,
    {
        let value = self.source.get_results().await?;
        (*self.result_converter)(value).map_err(OperationError::faulted)
    }
}
