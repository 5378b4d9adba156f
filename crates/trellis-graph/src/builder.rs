use std::sync::Arc;

use crate::error::GraphError;
use crate::key::{InputKey, Key};
use crate::node::{BoxError, Node, NodeId, NodeInner, NodeKind, RunFn, TypeTag, Value};

/// Single-use accumulator for one [`Node`].
///
/// Dependencies and input requirements are recorded positionally; the
/// combining function passed to [`define`](NodeBuilder::define) receives
/// dependency results first, then bound input values, in declaration order.
#[derive(Default)]
pub struct NodeBuilder {
  name: Option<String>,
  deps: Vec<Arc<NodeInner>>,
  inputs: Vec<InputKey>,
}

impl NodeBuilder {
  /// A fresh builder with no dependencies and no inputs.
  pub fn new() -> Self {
    Self::default()
  }

  /// Attach a debug name, used in error messages and tracing fields.
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Append one positional dependency on another node.
  pub fn depending_on<D: Send + Sync + 'static>(mut self, node: &Node<D>) -> Self {
    self.deps.push(node.inner.clone());
    self
  }

  /// Append one positional requirement for an unqualified external input
  /// of type `V`.
  pub fn with_input<V: Send + Sync + 'static>(self) -> Self {
    self.with_input_key(&Key::<V>::of())
  }

  /// Append one positional requirement for the external input addressed by
  /// `key`.
  pub fn with_input_key<V: Send + Sync + 'static>(mut self, key: &Key<V>) -> Self {
    self.inputs.push(key.erased());
    self
  }

  /// Finalize the node with its combining function.
  ///
  /// `f` takes one shared reference per declared dependency and input, in
  /// declaration order (dependencies first), and returns
  /// `Result<T, BoxError>`. Implemented for functions of up to 8
  /// parameters. Both the parameter count and each positional parameter
  /// type are validated here, at definition time, never at evaluation time.
  pub fn define<Args, F>(self, f: F) -> Result<Node<F::Output>, GraphError>
  where
    F: Combine<Args>,
  {
    let declared: Vec<TypeTag> = self
      .deps
      .iter()
      .map(|dep| dep.result_type)
      .chain(
        self
          .inputs
          .iter()
          .map(|key| TypeTag::from_parts(key.type_id(), key.type_name())),
      )
      .collect();

    let params = F::parameters();
    if params.len() != declared.len() {
      return Err(GraphError::ArityMismatch {
        expected: declared.len(),
        found: params.len(),
        deps: self.deps.len(),
        inputs: self.inputs.len(),
      });
    }
    for (position, (param, declaration)) in params.iter().zip(&declared).enumerate() {
      if !param.matches(declaration) {
        return Err(GraphError::ParameterType {
          position,
          expected: declaration.name(),
          found: param.name(),
        });
      }
    }

    let run: RunFn = Box::new(move |args| f.invoke(args));
    Ok(Node::from_inner(Arc::new(NodeInner {
      id: NodeId::next(),
      name: self.name,
      result_type: TypeTag::of::<F::Output>(),
      kind: NodeKind::Operation {
        deps: self.deps,
        inputs: self.inputs,
        run,
      },
    })))
  }
}

/// A combining function over positional, type-erased argument values.
///
/// Implemented for `Fn(&A, &B, ...) -> Result<T, BoxError>` up to 8
/// parameters; `Args` is the tuple of parameter types and ties a function to
/// the arity and types it was defined with.
pub trait Combine<Args>: Send + Sync + 'static {
  /// The node result type produced by this function.
  type Output: Send + Sync + 'static;

  /// Positional parameter types, checked against the builder's declarations.
  fn parameters() -> Vec<TypeTag>;

  /// Apply the function to the erased argument values.
  fn invoke(&self, args: &[Value]) -> Result<Value, BoxError>;
}

macro_rules! count {
  () => { 0usize };
  ($head:ident $(, $tail:ident)*) => { 1usize + count!($($tail),*) };
}

macro_rules! impl_combine {
  ($(($ty:ident, $ix:tt)),*) => {
    impl<Func, Out $(, $ty)*> Combine<($($ty,)*)> for Func
    where
      Func: Fn($(&$ty),*) -> Result<Out, BoxError> + Send + Sync + 'static,
      Out: Send + Sync + 'static,
      $($ty: Send + Sync + 'static,)*
    {
      type Output = Out;

      fn parameters() -> Vec<TypeTag> {
        vec![$(TypeTag::of::<$ty>()),*]
      }

      fn invoke(&self, args: &[Value]) -> Result<Value, BoxError> {
        debug_assert_eq!(args.len(), count!($($ty),*));
        let out = (self)($(
          args[$ix]
            .downcast_ref::<$ty>()
            .expect("argument types are validated when the node is defined")
        ),*)?;
        Ok(Arc::new(out))
      }
    }
  };
}

impl_combine!();
impl_combine!((A0, 0));
impl_combine!((A0, 0), (A1, 1));
impl_combine!((A0, 0), (A1, 1), (A2, 2));
impl_combine!((A0, 0), (A1, 1), (A2, 2), (A3, 3));
impl_combine!((A0, 0), (A1, 1), (A2, 2), (A3, 3), (A4, 4));
impl_combine!((A0, 0), (A1, 1), (A2, 2), (A3, 3), (A4, 4), (A5, 5));
impl_combine!((A0, 0), (A1, 1), (A2, 2), (A3, 3), (A4, 4), (A5, 5), (A6, 6));
impl_combine!(
  (A0, 0),
  (A1, 1),
  (A2, 2),
  (A3, 3),
  (A4, 4),
  (A5, 5),
  (A6, 6),
  (A7, 7)
);
