use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::GraphError;
use crate::key::InputKey;
use crate::node::{BoxError, Node, NodeId, NodeInner, NodeKind, Value};

/// One node of a resolved graph: the node itself plus its dependency edges
/// as indices into the graph's node table.
#[derive(Clone)]
pub struct ResolvedNode {
  inner: Arc<NodeInner>,
  deps: Vec<usize>,
}

impl ResolvedNode {
  /// The node's stable identity.
  pub fn id(&self) -> NodeId {
    self.inner.id
  }

  /// Human-readable label for errors and tracing.
  pub fn label(&self) -> String {
    self.inner.label()
  }

  /// Indices of this node's dependencies, in declaration order. Every
  /// index refers to an earlier entry of the node table.
  pub fn dependencies(&self) -> &[usize] {
    &self.deps
  }

  /// This node's own declared input keys, in declaration order.
  pub fn input_keys(&self) -> &[InputKey] {
    match &self.inner.kind {
      NodeKind::Operation { inputs, .. } => inputs,
      NodeKind::Deferred(_) => &[],
    }
  }

  /// Invoke the node's combining function with dependency results followed
  /// by bound input values. A deferred node passes its target's value
  /// through unchanged.
  pub fn invoke(&self, args: &[Value]) -> Result<Value, BoxError> {
    match &self.inner.kind {
      NodeKind::Operation { run, .. } => run(args),
      NodeKind::Deferred(_) => Ok(args[0].clone()),
    }
  }
}

struct GraphInner {
  /// Reachable nodes in dependency order: every edge points to an earlier
  /// index, so a single forward pass visits dependencies first.
  nodes: Vec<ResolvedNode>,
  root: usize,
  input_keys: HashSet<InputKey>,
  index_of: HashMap<NodeId, usize>,
}

/// The acyclic set of nodes reachable from one root, flattened into an
/// index-addressed table, plus the union of external input keys the whole
/// graph requires.
///
/// A `Graph` is immutable and cheap to clone; many computations may be
/// created from one graph and run concurrently without interfering.
pub struct Graph<T> {
  inner: Arc<GraphInner>,
  root_node: Node<T>,
}

impl<T> Clone for Graph<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      root_node: self.root_node.clone(),
    }
  }
}

impl<T: Send + Sync + 'static> Graph<T> {
  pub(crate) fn resolve(root: &Node<T>) -> Result<Self, GraphError> {
    enum Step {
      Enter(Arc<NodeInner>),
      Exit(Arc<NodeInner>),
    }
    enum Mark {
      Visiting,
      Done,
    }

    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut index_of: HashMap<NodeId, usize> = HashMap::new();
    let mut nodes: Vec<ResolvedNode> = Vec::new();
    let mut input_keys: HashSet<InputKey> = HashSet::new();
    let mut stack = vec![Step::Enter(root.inner.clone())];

    while let Some(step) = stack.pop() {
      match step {
        Step::Enter(node) => {
          match marks.get(&node.id) {
            Some(Mark::Done) => continue,
            // Re-entering a node whose exit is still pending means the
            // current path loops back into itself.
            Some(Mark::Visiting) => return Err(GraphError::Cycle { node: node.label() }),
            None => {}
          }
          marks.insert(node.id, Mark::Visiting);
          let dependencies = dependencies_of(&node)?;
          stack.push(Step::Exit(node));
          for dep in dependencies {
            stack.push(Step::Enter(dep));
          }
        }
        Step::Exit(node) => {
          let deps = dependencies_of(&node)?
            .iter()
            .map(|dep| index_of[&dep.id])
            .collect();
          if let NodeKind::Operation { inputs, .. } = &node.kind {
            input_keys.extend(inputs.iter().cloned());
          }
          marks.insert(node.id, Mark::Done);
          index_of.insert(node.id, nodes.len());
          nodes.push(ResolvedNode { inner: node, deps });
        }
      }
    }

    let root_index = index_of[&root.inner.id];
    Ok(Self {
      inner: Arc::new(GraphInner {
        nodes,
        root: root_index,
        input_keys,
        index_of,
      }),
      root_node: root.clone(),
    })
  }

  /// The deduplicated union of input keys over every reachable node.
  pub fn input_keys(&self) -> &HashSet<InputKey> {
    &self.inner.input_keys
  }

  /// The root node this graph was resolved from.
  pub fn result_node(&self) -> &Node<T> {
    &self.root_node
  }

  /// The resolved node table, in dependency order.
  pub fn nodes(&self) -> &[ResolvedNode] {
    &self.inner.nodes
  }

  /// Index of the root within the node table.
  pub fn root_index(&self) -> usize {
    self.inner.root
  }

  /// Index of a node within the table, if it is reachable from the root.
  pub fn index_of(&self, id: NodeId) -> Option<usize> {
    self.inner.index_of.get(&id).copied()
  }

  /// Number of reachable nodes.
  pub fn len(&self) -> usize {
    self.inner.nodes.len()
  }

  /// A graph always contains at least its root.
  pub fn is_empty(&self) -> bool {
    false
  }
}

fn dependencies_of(node: &Arc<NodeInner>) -> Result<Vec<Arc<NodeInner>>, GraphError> {
  match &node.kind {
    NodeKind::Operation { deps, .. } => Ok(deps.clone()),
    NodeKind::Deferred(slot) => match slot.get() {
      Some(target) => Ok(vec![target.clone()]),
      None => Err(GraphError::UnboundDeferred { node: node.label() }),
    },
  }
}
