//! The pluggable unit of "what a command does".

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

use crate::error::BoxError;

/// Strategy object behind an [`AsyncCommand`](crate::AsyncCommand).
///
/// Exactly two capabilities, no inheritance hierarchy: whether the
/// command may run with a given parameter, and the work itself.
/// Implement it directly for custom delegates, or use the closure-backed
/// [`FnDelegate`].
#[async_trait]
pub trait CommandDelegate<P, R>: Send + Sync {
    /// Whether the command may run with the given parameter.
    fn can_execute(&self, parameter: Option<&P>) -> bool;

    /// Perform the command's work.
    async fn execute(&self, parameter: Option<P>) -> Result<R, BoxError>;
}

type CanExecuteFn<P> = Box<dyn Fn(Option<&P>) -> bool + Send + Sync>;
type ExecuteFn<P, R> = Box<dyn Fn(Option<P>) -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync>;

/// Closure-backed default [`CommandDelegate`].
pub struct FnDelegate<P: 'static, R: 'static> {
    can_execute: CanExecuteFn<P>,
    execute: ExecuteFn<P, R>,
}

impl<P, R> FnDelegate<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Build a delegate from a guard predicate and a work closure.
    pub fn new<C, E, Fut>(can_execute: C, execute: E) -> Self
    where
        C: Fn(Option<&P>) -> bool + Send + Sync + 'static,
        E: Fn(Option<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self {
            can_execute: Box::new(can_execute),
            execute: Box::new(move |parameter| execute(parameter).boxed()),
        }
    }

    /// Build an always-executable delegate from a work closure alone.
    pub fn from_fn<E, Fut>(execute: E) -> Self
    where
        E: Fn(Option<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self::new(|_| true, execute)
    }
}

#[async_trait]
impl<P, R> CommandDelegate<P, R> for FnDelegate<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    fn can_execute(&self, parameter: Option<&P>) -> bool {
        (self.can_execute)(parameter)
    }

    async fn execute(&self, parameter: Option<P>) -> Result<R, BoxError> {
        (self.execute)(parameter).await
    }
}
