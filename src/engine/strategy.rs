//! Scoring strategies
//!
//! The strategy set is closed, so scoring is a single dispatch over
//! [`Strategy`] rather than a trait object per policy. Every formula is a
//! pure function of a [`TaskScore`] and the configuration.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DependencyNode, Priority, SelectorConfig, Strategy, Task};

use super::error::Result;

/// Multiplier applied by the dependency-aware strategy to in-progress work
pub const IN_PROGRESS_BOOST: f64 = 1.2;

/// Metrics of one task plus the score its strategy gave it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskScore {
    pub task: Task,
    pub dependent_count: usize,
    pub unblock_count: u32,
    pub dependency_depth: u32,
    pub critical_path_length: u32,
    pub hierarchy_depth: u32,
    pub priority: Priority,
    pub score: f64,
    pub reason: String,
    pub computed_at: DateTime<Utc>,
}

impl TaskScore {
    /// Collects the metrics of a node; the score itself is left at zero
    pub fn from_node(node: &DependencyNode) -> Self {
        Self {
            task: node.task.clone(),
            dependent_count: node.dependent_count,
            unblock_count: node.unblock_count,
            dependency_depth: node.dependency_depth,
            critical_path_length: node.critical_path_length,
            hierarchy_depth: node.hierarchy_depth,
            priority: node.task.priority,
            score: 0.0,
            reason: String::new(),
            computed_at: Utc::now(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.task.status.is_active()
    }
}

/// Computes the scalar score of `task` under `strategy`
pub fn score(strategy: Strategy, task: &TaskScore, config: &SelectorConfig) -> f64 {
    let priority = task.priority.score();
    let dependents = task.dependent_count as f64;

    match strategy {
        Strategy::CreationOrder => -(task.task.created_at.timestamp() as f64),

        Strategy::DependencyAware => {
            let w = &config.weights;
            let total = f64::from(task.unblock_count) * w.dependent_count
                + priority * w.priority
                + f64::from(task.hierarchy_depth + 1) * w.depth_first
                + f64::from(task.critical_path_length) * w.critical_path;
            if config.behavior.prefer_in_progress && task.is_in_progress() {
                total * IN_PROGRESS_BOOST
            } else {
                total
            }
        }

        Strategy::Priority => priority * 100.0 + dependents,

        Strategy::DepthFirst => {
            f64::from(task.hierarchy_depth) * 1000.0 + priority - dependents * 10.0
        }

        Strategy::CriticalPath => {
            f64::from(task.critical_path_length) * 100.0
                + f64::from(task.unblock_count) * 50.0
                + priority * 10.0
        }
    }
}

/// Resolves the configured strategy, validating only what it reads
///
/// The dependency-aware strategy is the only one whose weights are
/// sum-checked; the others never read the weights.
pub fn resolve_strategy(config: &SelectorConfig) -> Result<Strategy> {
    let strategy = config.strategy;
    if strategy.uses_weights() {
        config.weights.validate()?;
    }
    Ok(strategy)
}

/// Builds the human-readable reason attached to a selected score
pub fn explain(strategy: Strategy, task: &TaskScore) -> String {
    let mut parts = Vec::new();

    if task.is_in_progress() {
        parts.push("already in progress".to_string());
    }
    if task.unblock_count > 0 {
        parts.push(format!("unblocks {} task(s)", task.unblock_count));
    }
    parts.push(format!("{} priority", task.priority));
    if task.dependent_count > 0 {
        parts.push(format!("{} dependent(s)", task.dependent_count));
    }
    if task.hierarchy_depth > 0 {
        parts.push(format!("hierarchy depth {}", task.hierarchy_depth));
    }
    if task.critical_path_length > 1 {
        parts.push(format!("critical path length {}", task.critical_path_length));
    }

    format!(
        "Selected by {} strategy (score {:.2}): {}",
        strategy.display_name(),
        task.score,
        parts.join(", ")
    )
}
