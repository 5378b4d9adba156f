use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::key::InputKey;

/// Boxed error type returned by combining functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A type-erased value flowing through the graph. Dependency results are
/// handed to every dependent as a shared `Arc`, never cloned payload-wise.
pub type Value = Arc<dyn Any + Send + Sync>;

pub(crate) type RunFn = Box<dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Process-unique identity of a node. Stable for the node's lifetime and
/// across every graph the node participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
  pub(crate) fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  /// The raw id value.
  pub fn raw(&self) -> u64 {
    self.0
  }
}

/// Runtime tag for a parameter or result type: its `TypeId` plus the type
/// name for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
  id: TypeId,
  name: &'static str,
}

impl TypeTag {
  /// The tag for `T`.
  pub fn of<T: 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
    Self { id, name }
  }

  pub(crate) fn matches(&self, other: &TypeTag) -> bool {
    self.id == other.id
  }

  pub(crate) fn name(&self) -> &'static str {
    self.name
  }
}

pub(crate) enum NodeKind {
  /// A defined computation step: positional dependencies, positional input
  /// requirements, and the combining function over both.
  Operation {
    deps: Vec<Arc<NodeInner>>,
    inputs: Vec<InputKey>,
    run: RunFn,
  },
  /// A forward declaration, filled in later via [`DeferredHandle::bind`].
  Deferred(OnceLock<Arc<NodeInner>>),
}

pub(crate) struct NodeInner {
  pub(crate) id: NodeId,
  pub(crate) name: Option<String>,
  pub(crate) result_type: TypeTag,
  pub(crate) kind: NodeKind,
}

impl NodeInner {
  /// Human-readable label for errors and tracing.
  pub(crate) fn label(&self) -> String {
    match &self.name {
      Some(name) => name.clone(),
      None => format!("node-{}", self.id.0),
    }
  }
}

impl fmt::Debug for NodeInner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Node")
      .field("id", &self.id)
      .field("label", &self.label())
      .field("result_type", &self.result_type.name())
      .finish()
  }
}

/// Immutable description of one computation step: its result type `T`, its
/// ordered dependencies, its ordered external-input requirements, and the
/// function combining their values.
///
/// A `Node` is a cheap `Arc`-backed handle; cloning it never duplicates the
/// step. Nodes may be shared as dependencies of multiple other nodes, and a
/// shared node is evaluated at most once per computation.
pub struct Node<T> {
  pub(crate) inner: Arc<NodeInner>,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Node<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      _marker: PhantomData,
    }
  }
}

impl<T> fmt::Debug for Node<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt(f)
  }
}

impl<T: Send + Sync + 'static> Node<T> {
  pub(crate) fn from_inner(inner: Arc<NodeInner>) -> Self {
    Self {
      inner,
      _marker: PhantomData,
    }
  }

  /// A leaf node producing a fixed value: zero dependencies, zero inputs.
  pub fn constant(value: T) -> Self {
    let value: Value = Arc::new(value);
    Self::from_inner(Arc::new(NodeInner {
      id: NodeId::next(),
      name: None,
      result_type: TypeTag::of::<T>(),
      kind: NodeKind::Operation {
        deps: Vec::new(),
        inputs: Vec::new(),
        run: Box::new(move |_| Ok(value.clone())),
      },
    }))
  }

  /// A forward declaration of a node of type `T`.
  ///
  /// The returned placeholder can be used as a dependency before the real
  /// definition exists; the single-use handle fills it in. Graph resolution
  /// rejects a placeholder that was never bound, and rejects a binding that
  /// closes a dependency cycle.
  pub fn deferred() -> (Self, DeferredHandle<T>) {
    let inner = Arc::new(NodeInner {
      id: NodeId::next(),
      name: None,
      result_type: TypeTag::of::<T>(),
      kind: NodeKind::Deferred(OnceLock::new()),
    });
    let node = Self::from_inner(inner.clone());
    (node, DeferredHandle {
      inner,
      _marker: PhantomData,
    })
  }

  /// This node's own declared input keys, not a transitive aggregate.
  /// A bound deferred node reports its target's keys.
  pub fn input_keys(&self) -> HashSet<InputKey> {
    match &self.inner.kind {
      NodeKind::Operation { inputs, .. } => inputs.iter().cloned().collect(),
      NodeKind::Deferred(target) => match target.get() {
        Some(target) => match &target.kind {
          NodeKind::Operation { inputs, .. } => inputs.iter().cloned().collect(),
          NodeKind::Deferred(_) => HashSet::new(),
        },
        None => HashSet::new(),
      },
    }
  }

  /// Resolve the DAG reachable from this node, with this node as root.
  ///
  /// Fails if any reachable deferred node is unbound, or if the dependency
  /// relation contains a cycle. Construction is side-effect-free and may be
  /// repeated; each call returns an independent, equivalent graph.
  pub fn to_graph(&self) -> Result<Graph<T>, GraphError> {
    Graph::resolve(self)
  }

  /// The node's stable identity.
  pub fn id(&self) -> NodeId {
    self.inner.id
  }

  /// The node's label: its builder-assigned name, or a generated one.
  pub fn label(&self) -> String {
    self.inner.label()
  }
}

/// Single-use binder for a deferred node. Consuming `bind` makes a second
/// binding unrepresentable.
pub struct DeferredHandle<T> {
  inner: Arc<NodeInner>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DeferredHandle<T> {
  /// Bind the forward declaration to its definition.
  pub fn bind(self, target: &Node<T>) {
    match &self.inner.kind {
      NodeKind::Deferred(slot) => {
        // The handle is the only writer and is consumed here.
        let _ = slot.set(target.inner.clone());
      }
      NodeKind::Operation { .. } => unreachable!("deferred handles only wrap deferred nodes"),
    }
  }
}
