//! Single-use computation over a resolved graph.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tracing::{Instrument, debug, debug_span, error, info};
use trellis_graph::{Graph, InputKey, Key, Node, Value};
use uuid::Uuid;

use crate::error::{ComputeError, EvalError};
use crate::future::{SharedNode, ValueFuture};

/// Binding-and-evaluation state. `Accepting` holds the input bindings;
/// claiming the computation replaces them with the memoized per-node
/// futures of the evaluation pipeline. There is no backward transition.
enum Stage {
  Accepting { bindings: HashMap<InputKey, Value> },
  Running { node_futures: Vec<SharedNode> },
}

/// A single, stateful execution of one [`Graph`].
///
/// A computation starts out accepting input bindings for the graph's
/// required keys. The first [`compute`](Computation::compute) call claims
/// it: the evaluation pipeline is built and spawned once, and every
/// `compute` call - including the first - returns a handle to the same
/// memoized root future. After the claim, bindings are rejected.
///
/// The stage mutex guards only the bindings map and the claim itself; node
/// functions run on spawned tasks and never under an engine lock. The
/// computation object stays queryable after the future settles.
///
/// `compute` spawns onto the ambient tokio runtime and must be called
/// within one.
pub struct Computation<T> {
  graph: Graph<T>,
  id: Uuid,
  stage: Mutex<Stage>,
}

impl<T: Send + Sync + 'static> Computation<T> {
  /// A fresh computation over `graph`, accepting bindings, none bound.
  pub fn new(graph: &Graph<T>) -> Self {
    Self {
      graph: graph.clone(),
      id: Uuid::new_v4(),
      stage: Mutex::new(Stage::Accepting {
        bindings: HashMap::new(),
      }),
    }
  }

  /// The graph this computation evaluates.
  pub fn graph(&self) -> &Graph<T> {
    &self.graph
  }

  /// Unique id of this computation, carried on its tracing spans.
  pub fn id(&self) -> Uuid {
    self.id
  }

  /// Bind the external value addressed by `key`.
  ///
  /// The key must be one of the graph's required input keys, matched on
  /// the exact (type, qualifier) pair. Rebinding a key before `compute`
  /// overwrites the prior value; binding after `compute` has claimed the
  /// computation fails.
  pub fn bind_input<V: Send + Sync + 'static>(
    &self,
    key: &Key<V>,
    value: V,
  ) -> Result<(), ComputeError> {
    let erased = key.erased();
    if !self.graph.input_keys().contains(&erased) {
      return Err(ComputeError::UnknownInput { key: erased });
    }
    let mut stage = self.lock();
    match &mut *stage {
      Stage::Accepting { bindings } => {
        bindings.insert(erased, Arc::new(value));
        Ok(())
      }
      Stage::Running { .. } => Err(ComputeError::InputsClosed),
    }
  }

  /// Bind the external value addressed by the unqualified key for `V`.
  pub fn bind<V: Send + Sync + 'static>(&self, value: V) -> Result<(), ComputeError> {
    self.bind_input(&Key::<V>::of(), value)
  }

  /// Start evaluation, or read the memoized result future.
  ///
  /// The first call verifies that every required key has a bound value,
  /// then atomically claims the computation and builds the pipeline: one
  /// future per reachable node, spawned immediately, shared so that a
  /// diamond dependency is evaluated at most once. Later calls (from any
  /// thread) return a handle to the identical root future and never
  /// re-trigger evaluation.
  ///
  /// A missing-input failure does not claim the computation: the caller
  /// may bind the missing key and call `compute` again.
  pub fn compute(&self) -> Result<ValueFuture<T>, ComputeError> {
    let mut stage = self.lock();
    match &mut *stage {
      Stage::Running { node_futures } => Ok(ValueFuture::new(
        node_futures[self.graph.root_index()].clone(),
      )),
      Stage::Accepting { bindings } => {
        for key in self.graph.input_keys() {
          if !bindings.contains_key(key) {
            return Err(ComputeError::MissingInput { key: key.clone() });
          }
        }
        let node_futures = self.build_pipeline(bindings);
        let root = ValueFuture::new(node_futures[self.graph.root_index()].clone());
        info!(
          computation_id = %self.id,
          nodes = self.graph.len(),
          "computation started"
        );
        *stage = Stage::Running { node_futures };
        Ok(root)
      }
    }
  }

  /// The memoized future of any individual node of the graph.
  ///
  /// Returns `None` before `compute` has claimed the computation, or when
  /// the node is not reachable from the graph's root. A sibling branch can
  /// be observed completing here even while the root future fails.
  pub fn future_of<U: Send + Sync + 'static>(&self, node: &Node<U>) -> Option<ValueFuture<U>> {
    let index = self.graph.index_of(node.id())?;
    let stage = self.lock();
    match &*stage {
      Stage::Running { node_futures } => Some(ValueFuture::new(node_futures[index].clone())),
      Stage::Accepting { .. } => None,
    }
  }

  /// Build and spawn one shared future per node, in dependency order, so
  /// every dependency's future exists before its dependents'.
  fn build_pipeline(&self, bindings: &HashMap<InputKey, Value>) -> Vec<SharedNode> {
    let mut futures: Vec<SharedNode> = Vec::with_capacity(self.graph.len());
    for node in self.graph.nodes() {
      let deps: Vec<SharedNode> = node
        .dependencies()
        .iter()
        .map(|&index| futures[index].clone())
        .collect();
      let inputs: Vec<Value> = node
        .input_keys()
        .iter()
        .map(|key| {
          bindings
            .get(key)
            .expect("required inputs are verified bound before the pipeline is built")
            .clone()
        })
        .collect();
      let resolved = node.clone();
      let label = node.label();
      let span = debug_span!("node", computation_id = %self.id, node = %label);

      let task = async move {
        let mut args: Vec<Value> = Vec::with_capacity(deps.len() + inputs.len());
        for dep in deps {
          // The first dependency failure short-circuits this node without
          // invoking its function.
          args.push(dep.await?);
        }
        args.extend(inputs);
        match resolved.invoke(&args) {
          Ok(value) => {
            debug!("node completed");
            Ok(value)
          }
          Err(source) => {
            error!(error = %source, "node failed");
            Err(EvalError::NodeFailed {
              node: resolved.label(),
              source: Arc::from(source),
            })
          }
        }
      }
      .instrument(span);

      let shared = tokio::spawn(task)
        .map(move |joined| match joined {
          Ok(result) => result,
          Err(join) if join.is_panic() => Err(EvalError::NodePanicked { node: label }),
          Err(_) => Err(EvalError::Cancelled { node: label }),
        })
        .boxed()
        .shared();
      futures.push(shared);
    }
    futures
  }

  fn lock(&self) -> MutexGuard<'_, Stage> {
    self.stage.lock().unwrap_or_else(|e| e.into_inner())
  }
}
