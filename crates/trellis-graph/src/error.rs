use thiserror::Error;

/// Errors raised while defining nodes or resolving a graph. All of these
/// are synchronous and local to the call that caused them; nothing is
/// deferred to evaluation time.
#[derive(Debug, Error)]
pub enum GraphError {
  /// The combining function's parameter count does not equal the declared
  /// dependencies plus inputs.
  #[error(
    "combining function takes {found} parameters but {expected} were declared \
     ({deps} dependencies + {inputs} inputs)"
  )]
  ArityMismatch {
    expected: usize,
    found: usize,
    deps: usize,
    inputs: usize,
  },

  /// A positional parameter type does not match the declaration at that
  /// position.
  #[error("parameter {position} has type `{found}` but the declaration at that position produces `{expected}`")]
  ParameterType {
    position: usize,
    expected: &'static str,
    found: &'static str,
  },

  /// The dependency relation loops back through the named node.
  #[error("dependency cycle detected at node '{node}'")]
  Cycle { node: String },

  /// A deferred node reachable from the root was never bound.
  #[error("deferred node '{node}' was never bound to a definition")]
  UnboundDeferred { node: String },
}
