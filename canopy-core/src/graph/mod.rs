//! Task Graph
//!
//! This module implements the small dependency-graph scheduler used to run
//! lifecycle hook bindings.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are named tasks
//! - Edges are `after` constraints: if B runs after A, there is an edge from A to B
//!
//! A graph is built fresh for every hook invocation, validated up front
//! (missing names and cycles are errors, nothing runs), then executed with
//! every released task running concurrently.
//!
//! # Design Decisions
//!
//! 1. Task ids are declaration indexes, so the same declarations always
//!    produce the same graph and the same fallback names.
//!
//! 2. We maintain both forward (dependencies) and reverse (dependents) edges
//!    so a completion can release its dependents without a scan.

mod node;
mod scheduler;

pub use node::{TaskId, TaskNode};
pub use scheduler::{GraphError, TaskFailure, TaskGraph};
