//! Error types for computation binding and evaluation.

use std::sync::Arc;

use thiserror::Error;
use trellis_graph::InputKey;

/// Synchronous errors from [`Computation`](crate::Computation) calls:
/// binding misuse and state-machine misuse. These are raised at the
/// offending call and never carried inside the result future.
#[derive(Debug, Error)]
pub enum ComputeError {
  /// The key is not among the graph's required input keys. A type match
  /// with a mismatched qualifier is not a match.
  #[error("input '{key}' is not required by this graph")]
  UnknownInput { key: InputKey },

  /// `bind_input` was called after `compute` claimed the computation.
  #[error("inputs can no longer be bound once compute has been called")]
  InputsClosed,

  /// `compute` was called while a required input key has no bound value.
  #[error("no value bound for input '{key}'")]
  MissingInput { key: InputKey },
}

/// Asynchronous failure of a node, carried inside the result future and
/// propagated to every transitively dependent node. Cloneable because a
/// shared node's failure fans out to all of its dependents.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
  /// The node's combining function returned an error.
  #[error("node '{node}' failed: {source}")]
  NodeFailed {
    node: String,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync + 'static>,
  },

  /// The node's combining function panicked.
  #[error("node '{node}' panicked")]
  NodePanicked { node: String },

  /// The runtime was torn down before the node could complete.
  #[error("node '{node}' was cancelled before it could complete")]
  Cancelled { node: String },
}
