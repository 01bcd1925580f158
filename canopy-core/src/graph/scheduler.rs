//! Task Graph Scheduler
//!
//! Runs a set of named asynchronous tasks where each task may declare that it
//! must start only after other named tasks have completed.
//!
//! # Algorithm
//!
//! 1. Every task's `after` names are resolved to the tasks carrying those
//!    names. A name carried by several tasks is satisfied by the first of
//!    them that completes. A name carried by no task is an
//!    [`GraphError::UnmetDependency`].
//! 2. Kahn's algorithm orders the graph. Tasks left over after the sort sit on
//!    a cycle and are reported as [`GraphError::Cycle`]. Nothing has run yet at
//!    this point.
//! 3. Execution starts every root task concurrently. Each completion satisfies
//!    its name and releases the dependents whose last outstanding name it was.
//!    An optional
//!    limit bounds how many tasks are in flight at once.
//!
//! A failed task does not satisfy its name, so its dependents are skipped.
//! Independent branches still run to completion before the failure is
//! returned.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};
use smallvec::SmallVec;

use super::node::{TaskId, TaskNode};

/// Validation errors for a task graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("task `{task}` waits for `{missing}`, which no task provides")]
    UnmetDependency { task: String, missing: String },

    #[error("tasks form a dependency cycle: {}", .tasks.join(", "))]
    Cycle { tasks: Vec<String> },
}

/// The first failure observed while executing a graph.
#[derive(Debug)]
pub struct TaskFailure<E> {
    /// Name of the failed task.
    pub task: String,
    /// The error it produced.
    pub error: E,
    /// Tasks that never ran because something they waited on failed.
    pub skipped: Vec<String>,
}

/// A graph of named tasks with `after` ordering constraints.
#[derive(Debug)]
pub struct TaskGraph<T> {
    /// All nodes, indexed by [`TaskId`].
    nodes: Vec<TaskNode<T>>,

    /// Task ids carrying each name.
    by_name: HashMap<String, SmallVec<[TaskId; 1]>>,

    /// Set once names were resolved into edges.
    linked: bool,
}

impl<T> TaskGraph<T> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            by_name: HashMap::new(),
            linked: false,
        }
    }

    /// Add a task.
    ///
    /// Unnamed tasks are named after their position (`#0`, `#1`, ...).
    pub fn add_task<I, S>(&mut self, name: Option<String>, after: I, payload: T) -> TaskId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = TaskId::from(self.nodes.len());
        let name = name.unwrap_or_else(|| id.positional_name());
        let after = after.into_iter().map(Into::into).collect();

        self.by_name.entry(name.clone()).or_default().push(id);
        self.nodes.push(TaskNode::new(id, name, after, payload));
        self.linked = false;
        id
    }

    /// Get a node by id.
    pub fn get(&self, id: TaskId) -> Option<&TaskNode<T>> {
        self.nodes.get(id.index())
    }

    /// Get the total number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve `after` names into dependency edges and check for cycles.
    pub fn validate(&mut self) -> Result<(), GraphError> {
        if !self.linked {
            self.link()?;
        }

        let order = self.topological_order();
        if order.len() < self.nodes.len() {
            let mut sorted = vec![false; self.nodes.len()];
            for id in order {
                sorted[id.index()] = true;
            }

            let tasks = self
                .nodes
                .iter()
                .filter(|node| !sorted[node.id().index()])
                .map(|node| node.name().to_string())
                .collect();

            return Err(GraphError::Cycle { tasks });
        }

        Ok(())
    }

    fn link(&mut self) -> Result<(), GraphError> {
        let mut edges = Vec::new();

        for node in &self.nodes {
            for name in node.after() {
                let providers = self.by_name.get(name).ok_or_else(|| GraphError::UnmetDependency {
                    task: node.name().to_string(),
                    missing: name.clone(),
                })?;

                for &provider in providers {
                    edges.push((provider, node.id()));
                }
            }
        }

        for (dependency, dependent) in edges {
            self.add_edge(dependency, dependent);
        }

        self.linked = true;
        Ok(())
    }

    /// Add a dependency edge: `dependent` waits for `dependency`.
    fn add_edge(&mut self, dependency: TaskId, dependent: TaskId) {
        if let Some(node) = self.nodes.get_mut(dependency.index()) {
            node.add_dependent(dependent);
        }
        if let Some(node) = self.nodes.get_mut(dependent.index()) {
            node.add_dependency(dependency);
        }
    }

    /// Order tasks so that dependencies come before dependents.
    ///
    /// Tasks on a cycle are missing from the result.
    pub fn topological_order(&self) -> Vec<TaskId> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.dependencies().len()).collect();
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<TaskId> = self
            .nodes
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.id())
            .collect();

        // Kahn's algorithm
        while let Some(id) = queue.pop_front() {
            result.push(id);

            for &dependent in self.nodes[id.index()].dependents() {
                let degree = &mut in_degree[dependent.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        result
    }

    /// Validate the graph and run every task.
    ///
    /// `run` is called once per task when the task is released and must
    /// return the future that performs it. At most `limit` futures are in
    /// flight at a time; `None` means unbounded.
    pub async fn execute<F, Fut, E>(
        mut self,
        limit: Option<usize>,
        mut run: F,
    ) -> Result<Result<(), TaskFailure<E>>, GraphError>
    where
        F: FnMut(&TaskNode<T>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        self.validate()?;

        let limit = limit.unwrap_or(usize::MAX).max(1);
        let mut outstanding: Vec<HashSet<&str>> = self
            .nodes
            .iter()
            .map(|n| n.after().iter().map(String::as_str).collect())
            .collect();
        let mut started = vec![false; self.nodes.len()];
        let mut ready: VecDeque<TaskId> = self
            .nodes
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.id())
            .collect();

        let mut running = FuturesUnordered::new();
        let mut failure: Option<(String, E)> = None;

        loop {
            while running.len() < limit {
                let Some(id) = ready.pop_front() else {
                    break;
                };

                started[id.index()] = true;
                let task = run(&self.nodes[id.index()]);
                running.push(async move { (id, task.await) });
            }

            let Some((id, outcome)) = running.next().await else {
                break;
            };

            match outcome {
                Ok(()) => {
                    let node = &self.nodes[id.index()];
                    for &dependent in node.dependents() {
                        let waiting = &mut outstanding[dependent.index()];
                        if waiting.remove(node.name()) && waiting.is_empty() && !started[dependent.index()] {
                            ready.push_back(dependent);
                        }
                    }
                }

                Err(error) => {
                    if failure.is_none() {
                        failure = Some((self.nodes[id.index()].name().to_string(), error));
                    }
                }
            }
        }

        Ok(match failure {
            None => Ok(()),
            Some((task, error)) => {
                let skipped = self
                    .nodes
                    .iter()
                    .filter(|n| !started[n.id().index()])
                    .map(|n| n.name().to_string())
                    .collect();

                Err(TaskFailure { task, error, skipped })
            }
        })
    }
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}
