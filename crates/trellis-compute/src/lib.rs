//! Trellis compute
//!
//! This crate provides the [`Computation`]: a single-use, asynchronous
//! execution of a `trellis-graph` [`Graph`](trellis_graph::Graph).
//!
//! A computation accepts bindings for the graph's required input keys, and
//! on the first `compute` call builds its evaluation pipeline: one tokio
//! task per reachable node, each a continuation on its dependencies'
//! shared futures. Evaluation is memoized per computation (a diamond
//! dependency runs once), failures short-circuit every downstream
//! dependent while unrelated branches run to completion, and repeated
//! `compute` calls return the same root future.

mod computation;
mod error;
mod future;

pub use computation::Computation;
pub use error::{ComputeError, EvalError};
pub use future::ValueFuture;
