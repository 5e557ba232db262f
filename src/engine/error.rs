//! Error types for the selection engine
//!
//! Every failure carries a machine-readable [`ErrorKind`] and a message.
//! Deadlock, no-actionable and circular-dependency failures also carry an
//! [`ErrorContext`] naming the implicated tasks and suggested remediation.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ConfigError;

pub type Result<T> = std::result::Result<T, SelectionError>;

/// Machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoTasks,
    NoActionable,
    Deadlock,
    CircularDependency,
    InvalidConfig,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoTasks => "no_tasks",
            ErrorKind::NoActionable => "no_actionable",
            ErrorKind::Deadlock => "deadlock",
            ErrorKind::CircularDependency => "circular_dependency",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tasks implicated in a failure plus remediation hints for end users
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorContext {
    pub task_ids: Vec<Uuid>,
    pub task_titles: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty() && self.task_titles.is_empty() && self.suggestions.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("No tasks provided")]
    NoTasks,

    #[error("No actionable tasks: {message}")]
    NoActionable {
        message: String,
        context: ErrorContext,
    },

    #[error("Deadlock: {message}")]
    Deadlock {
        message: String,
        context: ErrorContext,
    },

    #[error("Circular dependency detected between tasks: {}", join_ids(&.context.task_ids))]
    CircularDependency { context: ErrorContext },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Validation failed: {0}")]
    Validation(String),
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SelectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SelectionError::NoTasks => ErrorKind::NoTasks,
            SelectionError::NoActionable { .. } => ErrorKind::NoActionable,
            SelectionError::Deadlock { .. } => ErrorKind::Deadlock,
            SelectionError::CircularDependency { .. } => ErrorKind::CircularDependency,
            SelectionError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            SelectionError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Enriched context, when the failure carries any
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SelectionError::NoActionable { context, .. }
            | SelectionError::Deadlock { context, .. }
            | SelectionError::CircularDependency { context } => Some(context),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        self.context()
            .map(|c| c.suggestions.as_slice())
            .unwrap_or(&[])
    }

    /// True when the caller can recover by changing task state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoActionable | ErrorKind::Deadlock | ErrorKind::Validation
        )
    }
}

/// Category of a dependency finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    CircularDependency,
    MissingDependency,
}

/// A structural defect found while validating task dependencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub task_id: Uuid,

    /// The missing dependency id, for missing-dependency findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Uuid>,

    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_machine_readable() {
        assert_eq!(SelectionError::NoTasks.kind().as_str(), "no_tasks");
        assert_eq!(
            SelectionError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        let err: SelectionError = ConfigError::Invalid("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(err.to_string(), "Invalid configuration: bad");
    }

    #[test]
    fn circular_dependency_message_lists_ids() {
        let id = Uuid::new_v4();
        let err = SelectionError::CircularDependency {
            context: ErrorContext {
                task_ids: vec![id],
                ..ErrorContext::default()
            },
        };
        assert!(err.to_string().contains(&id.to_string()));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn suggestions_come_from_context() {
        let err = SelectionError::Deadlock {
            message: "stuck".into(),
            context: ErrorContext {
                suggestions: vec!["complete X".into()],
                ..ErrorContext::default()
            },
        };
        assert_eq!(err.suggestions(), ["complete X".to_string()]);
        assert!(SelectionError::NoTasks.suggestions().is_empty());
    }
}
