//! Actionability validation
//!
//! A task is actionable when it is pending or in progress, every dependency
//! is completed (unresolved ids block it only in strict mode), and it has
//! no open subtasks unless parents with subtasks are allowed.

use crate::domain::{Behavior, DependencyGraph, DependencyNode};

use super::builder::missing_dependency_reason;
use super::metrics::has_active_children;

pub const ACTIVE_SUBTASKS_REASON: &str = "has active subtasks";

/// Outcome of validating one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actionability {
    pub actionable: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ActionabilityValidator {
    behavior: Behavior,
}

impl ActionabilityValidator {
    pub fn new(behavior: Behavior) -> Self {
        Self { behavior }
    }

    /// Checks one node against the graph; pure, no caching
    pub fn check(&self, graph: &DependencyGraph, node: &DependencyNode) -> Actionability {
        let mut reasons = Vec::new();
        let status = node.task.status;

        if !status.is_workable() {
            reasons.push(format!("status is {}", status));
        }

        for dependency in &node.dependencies {
            match graph.node(dependency) {
                Some(dep) if dep.task.status.is_complete() => {}
                Some(dep) => reasons.push(format!(
                    "dependency {} is not completed ({})",
                    dependency, dep.task.status
                )),
                None if self.behavior.strict_dependencies => {
                    reasons.push(missing_dependency_reason(dependency))
                }
                None => {}
            }
        }

        if !self.behavior.allow_parent_with_subtasks && has_active_children(graph, node.id()) {
            reasons.push(ACTIVE_SUBTASKS_REASON.to_string());
        }

        Actionability {
            actionable: reasons.is_empty(),
            reasons,
        }
    }

    /// Validates every node, recording the flag, reasons and actionable count
    pub fn apply(&self, graph: &mut DependencyGraph) {
        let results: Vec<_> = graph
            .nodes_in_order()
            .map(|node| (node.id(), self.check(graph, node)))
            .collect();

        let mut actionable_count = 0;
        for (id, result) in results {
            if let Some(node) = graph.node_mut(&id) {
                node.is_actionable = result.actionable;
                for reason in result.reasons {
                    node.add_blocking_reason(reason);
                }
                if result.actionable {
                    actionable_count += 1;
                }
            }
        }
        graph.actionable_count = actionable_count;
    }
}
