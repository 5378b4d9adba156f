//! Integration tests for node definition and graph resolution.

use trellis_graph::{BoxError, GraphError, Key, Node, NodeBuilder};

fn add(a: &i64, b: &i64) -> Result<i64, BoxError> {
  Ok(a + b)
}

fn double(a: &i64) -> Result<i64, BoxError> {
  Ok(a * 2)
}

#[test]
fn test_constant_node_has_no_input_keys() {
  let node = Node::constant(7_i64);
  let graph = node.to_graph().expect("constant resolves");

  assert!(node.input_keys().is_empty());
  assert!(graph.input_keys().is_empty());
  assert_eq!(graph.len(), 1);
}

#[test]
fn test_define_validates_arity() {
  let dep = Node::constant(1_i64);
  let result = NodeBuilder::new().depending_on(&dep).define(add);

  match result {
    Err(GraphError::ArityMismatch {
      expected, found, ..
    }) => {
      assert_eq!(expected, 1);
      assert_eq!(found, 2);
    }
    _ => panic!("expected an arity mismatch at define time"),
  }
}

#[test]
fn test_define_validates_parameter_types() {
  let dep = Node::constant(1_i64);
  let result = NodeBuilder::new()
    .depending_on(&dep)
    .define(|s: &String| -> Result<String, BoxError> { Ok(s.clone()) });

  match result {
    Err(GraphError::ParameterType { position, .. }) => assert_eq!(position, 0),
    _ => panic!("expected a parameter type mismatch at define time"),
  }
}

#[test]
fn test_node_input_keys_are_own_only() {
  let child = NodeBuilder::new()
    .with_input::<i64>()
    .define(double)
    .expect("child definition");
  let parent = NodeBuilder::new()
    .depending_on(&child)
    .with_input::<String>()
    .define(|n: &i64, s: &String| -> Result<String, BoxError> { Ok(format!("{}{}", s, n)) })
    .expect("parent definition");

  let parent_keys = parent.input_keys();
  assert_eq!(parent_keys.len(), 1);
  assert!(parent_keys.contains(&Key::<String>::of().erased()));
  assert!(!parent_keys.contains(&Key::<i64>::of().erased()));
}

#[test]
fn test_graph_input_keys_union_deduplicated() {
  let rate = Key::<i64>::qualified("rate");

  let left = NodeBuilder::new()
    .with_input::<i64>()
    .define(double)
    .expect("left definition");
  let right = NodeBuilder::new()
    .with_input::<i64>()
    .with_input_key(&rate)
    .define(add)
    .expect("right definition");
  let root = NodeBuilder::new()
    .depending_on(&left)
    .depending_on(&right)
    .define(add)
    .expect("root definition");

  let graph = root.to_graph().expect("graph resolves");

  // The unqualified i64 key appears in two nodes but once in the union.
  assert_eq!(graph.input_keys().len(), 2);
  assert!(graph.input_keys().contains(&Key::<i64>::of().erased()));
  assert!(graph.input_keys().contains(&rate.erased()));
}

#[test]
fn test_diamond_shares_one_resolved_node() {
  let base = Node::constant(1_i64);
  let left = NodeBuilder::new()
    .depending_on(&base)
    .define(double)
    .expect("left definition");
  let right = NodeBuilder::new()
    .depending_on(&base)
    .define(double)
    .expect("right definition");
  let root = NodeBuilder::new()
    .depending_on(&left)
    .depending_on(&right)
    .define(add)
    .expect("root definition");

  let graph = root.to_graph().expect("graph resolves");

  // base, left, right, root - base is not duplicated.
  assert_eq!(graph.len(), 4);
}

#[test]
fn test_nodes_are_in_dependency_order() {
  let base = Node::constant(1_i64);
  let left = NodeBuilder::new()
    .depending_on(&base)
    .define(double)
    .expect("left definition");
  let right = NodeBuilder::new()
    .depending_on(&base)
    .define(double)
    .expect("right definition");
  let root = NodeBuilder::new()
    .depending_on(&left)
    .depending_on(&right)
    .define(add)
    .expect("root definition");

  let graph = root.to_graph().expect("graph resolves");

  for (index, node) in graph.nodes().iter().enumerate() {
    for &dep in node.dependencies() {
      assert!(dep < index, "dependency edges must point at earlier entries");
    }
  }
  assert_eq!(graph.root_index(), graph.len() - 1);
  assert_eq!(graph.result_node().id(), root.id());
}

#[test]
fn test_cycle_rejected_at_resolution() {
  let (placeholder, handle) = Node::<i64>::deferred();
  let looped = NodeBuilder::new()
    .named("looped")
    .depending_on(&placeholder)
    .define(double)
    .expect("looped definition");
  handle.bind(&looped);

  let result = looped.to_graph();
  assert!(matches!(result, Err(GraphError::Cycle { .. })));
}

#[test]
fn test_transitive_cycle_rejected() {
  let (placeholder, handle) = Node::<i64>::deferred();
  let middle = NodeBuilder::new()
    .depending_on(&placeholder)
    .define(double)
    .expect("middle definition");
  let top = NodeBuilder::new()
    .depending_on(&middle)
    .define(double)
    .expect("top definition");
  handle.bind(&top);

  assert!(matches!(top.to_graph(), Err(GraphError::Cycle { .. })));
}

#[test]
fn test_unbound_deferred_rejected() {
  let (placeholder, _handle) = Node::<i64>::deferred();
  let root = NodeBuilder::new()
    .depending_on(&placeholder)
    .define(double)
    .expect("root definition");

  assert!(matches!(
    root.to_graph(),
    Err(GraphError::UnboundDeferred { .. })
  ));
}

#[test]
fn test_forward_reference_resolves() {
  let (placeholder, handle) = Node::<i64>::deferred();
  let root = NodeBuilder::new()
    .depending_on(&placeholder)
    .define(double)
    .expect("root definition");
  handle.bind(&Node::constant(21_i64));

  let graph = root.to_graph().expect("acyclic forward reference resolves");
  // constant, placeholder passthrough, root.
  assert_eq!(graph.len(), 3);
  assert!(graph.input_keys().is_empty());
}

#[test]
fn test_to_graph_is_repeatable() {
  let root = NodeBuilder::new()
    .with_input::<i64>()
    .define(double)
    .expect("root definition");

  let first = root.to_graph().expect("first resolution");
  let second = root.to_graph().expect("second resolution");

  assert_eq!(first.input_keys(), second.input_keys());
  assert_eq!(first.len(), second.len());
  assert_eq!(first.result_node().id(), second.result_node().id());
}

#[test]
fn test_named_node_label() {
  let node = NodeBuilder::new()
    .named("totals")
    .define(|| -> Result<i64, BoxError> { Ok(0) })
    .expect("definition");

  assert_eq!(node.label(), "totals");
}

#[test]
fn test_duplicate_dependency_is_two_arguments() {
  let base = Node::constant(3_i64);
  let root = NodeBuilder::new()
    .depending_on(&base)
    .depending_on(&base)
    .define(add)
    .expect("root definition");

  let graph = root.to_graph().expect("graph resolves");
  // The node appears once in the table, twice in the root's edge list.
  assert_eq!(graph.len(), 2);
  assert_eq!(graph.nodes()[graph.root_index()].dependencies().len(), 2);
}
