//! The capability a queue's target exposes, and the result it hands back.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;

/// A deferred transform result.
pub type TransformFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Outcome of asking a target to apply one operation.
///
/// `Immediate(Err(_))` is how a handler that fails synchronously reports it;
/// the queue treats it exactly like a `Pending` future that rejects.
pub enum Transformation<T, E> {
    Immediate(Result<T, E>),
    Pending(TransformFuture<T, E>),
}

impl<T, E> Transformation<T, E> {
    pub fn ok(value: T) -> Self {
        Self::Immediate(Ok(value))
    }

    pub fn err(error: E) -> Self {
        Self::Immediate(Err(error))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl<T, E> From<Result<T, E>> for Transformation<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Self::Immediate(result)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Transformation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// An object whose mutations are applied through a `TransformQueue`.
///
/// The queue calls [`transform`](Transformable::transform) once per operation,
/// strictly one at a time, and never interprets the operation itself.
pub trait Transformable: Send + Sync + 'static {
    type Operation: Send + Sync + 'static;
    type Output: Send + 'static;
    type Error: fmt::Debug + Send + Sync + 'static;

    fn transform(&self, operation: &Self::Operation) -> Transformation<Self::Output, Self::Error>;
}
