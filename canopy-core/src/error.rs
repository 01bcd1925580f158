//! Error types for meta construction and lifecycle orchestration.

use std::fmt;

use crate::graph::GraphError;

/// Failure produced by a user-supplied handler (hook, method, watcher).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type MetaResult<T> = Result<T, MetaError>;

/// Errors that can occur while building or driving a component.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("Component name `{name}` is already registered by class `{class}`")]
    DuplicateComponent { name: String, class: String },

    #[error("Field `{field}` is declared more than once in `{component}`")]
    DuplicateField { component: String, field: String },

    #[error("Field `{field}` of `{component}` waits for unknown field `{after}`")]
    UnknownFieldDependency {
        component: String,
        field: String,
        after: String,
    },

    #[error("Parent class `{0}` is not registered")]
    UnknownParent(String),

    #[error("The specified method ({method}) for watching `{key}` is not defined")]
    MethodNotFound { key: String, method: String },

    #[error("Component `{component}` has no method `{method}`")]
    UnknownMethod { component: String, method: String },

    #[error("Fields can never be initialized, their dependencies are unsatisfiable: {}", .fields.join(", "))]
    FieldStall { fields: Vec<String> },

    #[error("Hook `{hook}`: {source}")]
    HookGraph {
        hook: String,
        #[source]
        source: GraphError,
    },

    #[error("Required prop `{prop}` of `{component}` has no value")]
    MissingProp { component: String, prop: String },

    #[error("Component `{0}` is abstract and cannot be assembled")]
    AbstractComponent(String),

    #[error("Template for `{0}` did not become available")]
    TemplateUnavailable(String),

    #[error("Handler `{name}` failed: {source}")]
    Handler {
        name: String,
        #[source]
        source: HandlerError,
    },
}

impl MetaError {
    /// Wrap a handler failure with the name of the handler that produced it.
    pub fn handler(name: impl Into<String>, source: HandlerError) -> Self {
        MetaError::Handler {
            name: name.into(),
            source,
        }
    }

    /// Whether this error is a configuration error that must abort assembly.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MetaError::Handler { .. })
    }
}

/// A plain-message handler error, handy for closures that fail with text.
#[derive(Debug, Clone)]
pub struct HandlerMessage(pub String);

impl fmt::Display for HandlerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HandlerMessage {}

impl From<&str> for HandlerMessage {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
