//! Domain models for taskpick
//!
//! Contains the task model, the dependency graph model and the selector
//! configuration, without any I/O concerns.

mod config;
mod graph;
mod task;

pub use config::{
    validate_config, Advanced, Behavior, ConfigError, Preset, SelectorConfig, Strategy, Weights,
    WEIGHT_SUM_TOLERANCE,
};
pub use graph::{DependencyGraph, DependencyNode};
pub use task::{Priority, Task, TaskStatus};
