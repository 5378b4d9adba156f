//! Trellis graph
//!
//! This crate provides the immutable, declarative half of trellis: typed
//! input keys, the single-use node builder, and resolution of a node's
//! reachable dependency set into a validated [`Graph`].
//!
//! A [`Node`] describes one computation step: its result type, its ordered
//! dependencies on other nodes, its ordered requirements on external inputs
//! (addressed by [`Key`]), and the function combining their values.
//! [`Node::to_graph`] flattens everything reachable from a root into an
//! index-addressed table, rejecting cycles and unbound forward declarations,
//! and aggregates the input keys the whole graph requires.
//!
//! Graphs are immutable and reusable; executing one is the job of the
//! `trellis-compute` crate.

mod builder;
mod error;
mod graph;
mod key;
mod node;

pub use builder::{Combine, NodeBuilder};
pub use error::GraphError;
pub use graph::{Graph, ResolvedNode};
pub use key::{InputKey, Key};
pub use node::{BoxError, DeferredHandle, Node, NodeId, TypeTag, Value};
