//! Task Nodes
//!
//! This module defines the node type that lives in a [`TaskGraph`](super::TaskGraph).

use std::collections::HashSet;
use std::fmt;

use smallvec::SmallVec;

/// Identifier of a task inside one graph.
///
/// Ids are positional: the n-th task added to a graph has id `n`. This keeps
/// graphs reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    /// Get the raw index value.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Fallback name for a task that was added without one.
    pub fn positional_name(&self) -> String {
        format!("#{}", self.0)
    }
}

impl From<usize> for TaskId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the task graph.
#[derive(Debug)]
pub struct TaskNode<T> {
    /// Unique identifier for this node.
    id: TaskId,

    /// Name other tasks refer to in their `after` sets.
    name: String,

    /// Names this task waits for, as declared.
    after: SmallVec<[String; 2]>,

    /// Tasks that must complete before this one starts.
    dependencies: HashSet<TaskId>,

    /// Tasks waiting for this one.
    dependents: HashSet<TaskId>,

    payload: T,
}

impl<T> TaskNode<T> {
    pub(super) fn new(id: TaskId, name: String, after: SmallVec<[String; 2]>, payload: T) -> Self {
        Self {
            id,
            name,
            after,
            dependencies: HashSet::new(),
            dependents: HashSet::new(),
            payload,
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names this task was declared to run after.
    pub fn after(&self) -> &[String] {
        &self.after
    }

    /// Get the payload carried by this node.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Add a dependency (a task this node waits for).
    pub fn add_dependency(&mut self, id: TaskId) {
        self.dependencies.insert(id);
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &HashSet<TaskId> {
        &self.dependencies
    }

    /// Add a dependent (a task that waits for this node).
    pub fn add_dependent(&mut self, id: TaskId) {
        self.dependents.insert(id);
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &HashSet<TaskId> {
        &self.dependents
    }

    /// Whether the task can start immediately.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn positional_names_follow_index() {
        assert_eq!(TaskId::from(0).positional_name(), "#0");
        assert_eq!(TaskId::from(7).to_string(), "#7");
    }

    #[test]
    fn dependency_management() {
        let mut node = TaskNode::new(TaskId::from(2), "y".into(), smallvec!["x".to_string()], ());
        assert!(node.is_root());

        node.add_dependency(TaskId::from(0));
        node.add_dependency(TaskId::from(1));
        node.add_dependency(TaskId::from(0));

        assert_eq!(node.dependencies().len(), 2);
        assert!(!node.is_root());
        assert_eq!(node.after(), ["x".to_string()]);
    }
}
