//! Typed view over a node's memoized, shared evaluation future.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use trellis_graph::Value;

use crate::error::EvalError;

/// The memoized evaluation future of one node. Cloning is cheap and every
/// clone observes the same single evaluation.
pub(crate) type SharedNode = Shared<BoxFuture<'static, Result<Value, EvalError>>>;

/// A typed handle to a node's memoized result future.
///
/// Awaiting yields `Result<Arc<T>, EvalError>`; the value is shared with
/// every other dependent of the node, never cloned payload-wise. All
/// handles returned for the same node of the same computation point at one
/// underlying evaluation ([`ValueFuture::ptr_eq`] observes this).
pub struct ValueFuture<T> {
  inner: SharedNode,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ValueFuture<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      _marker: PhantomData,
    }
  }
}

impl<T: Send + Sync + 'static> ValueFuture<T> {
  pub(crate) fn new(inner: SharedNode) -> Self {
    Self {
      inner,
      _marker: PhantomData,
    }
  }

  /// Whether two handles share the same underlying evaluation.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    self.inner.ptr_eq(&other.inner)
  }

  /// The settled result, if the evaluation has already completed.
  pub fn peek(&self) -> Option<Result<Arc<T>, EvalError>> {
    self.inner.peek().cloned().map(downcast::<T>)
  }
}

impl<T: Send + Sync + 'static> Future for ValueFuture<T> {
  type Output = Result<Arc<T>, EvalError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let result = ready!(self.get_mut().inner.poll_unpin(cx));
    Poll::Ready(downcast::<T>(result))
  }
}

fn downcast<T: Send + Sync + 'static>(result: Result<Value, EvalError>) -> Result<Arc<T>, EvalError> {
  result.map(|value| {
    value
      .downcast::<T>()
      .unwrap_or_else(|_| unreachable!("node result type is fixed when the node is defined"))
  })
}
