//! Actionable-task filtering and deadlock diagnosis

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{DependencyGraph, DependencyNode, TaskStatus};

use super::error::{ErrorContext, Result, SelectionError};

#[derive(Debug, Default, Clone, Copy)]
pub struct TaskFilter;

impl TaskFilter {
    pub fn new() -> Self {
        Self
    }

    /// Returns the actionable nodes of `graph` in input order
    ///
    /// When none qualify, fails with `deadlock` if pending or in-progress
    /// work remains and with `no_actionable` otherwise.
    pub fn actionable<'g>(&self, graph: &'g DependencyGraph) -> Result<Vec<&'g DependencyNode>> {
        let actionable: Vec<_> = graph.nodes_in_order().filter(|n| n.is_actionable).collect();
        debug!(
            total = graph.total_tasks,
            actionable = actionable.len(),
            "filtered actionable tasks"
        );

        if !actionable.is_empty() {
            return Ok(actionable);
        }

        let stuck: Vec<&DependencyNode> = graph
            .nodes_in_order()
            .filter(|n| n.task.status.is_workable())
            .collect();

        if stuck.is_empty() {
            Err(no_actionable(graph))
        } else {
            Err(deadlock(&stuck))
        }
    }
}

fn deadlock(stuck: &[&DependencyNode]) -> SelectionError {
    let mut suggestions = Vec::new();
    for node in stuck {
        for reason in &node.blocking_reasons {
            let suggestion = format!("{}: {}", node.task.label(), reason);
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }
    }
    suggestions.push(
        "Complete, unblock or remove the dependencies listed above, or relax strict_dependencies"
            .to_string(),
    );

    SelectionError::Deadlock {
        message: format!(
            "{} task(s) have work remaining but none can be started",
            stuck.len()
        ),
        context: ErrorContext {
            task_ids: stuck.iter().map(|n| n.id()).collect(),
            task_titles: stuck.iter().map(|n| n.task.label()).collect(),
            suggestions,
        },
    }
}

fn no_actionable(graph: &DependencyGraph) -> SelectionError {
    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    for node in graph.nodes_in_order() {
        *by_status.entry(node.task.status.as_str()).or_default() += 1;
    }
    let summary = by_status
        .iter()
        .map(|(status, count)| format!("{} {}", count, status))
        .collect::<Vec<_>>()
        .join(", ");

    let blocked: Vec<&DependencyNode> = graph
        .nodes_in_order()
        .filter(|n| n.task.status == TaskStatus::Blocked)
        .collect();

    let mut suggestions = Vec::new();
    if !blocked.is_empty() {
        suggestions.push("Resolve the tasks marked as blocked".to_string());
    }
    if by_status.len() == 1 && by_status.contains_key(TaskStatus::Completed.as_str()) {
        suggestions.push("All tasks are completed; add new work".to_string());
    } else {
        suggestions.push("Add a new pending task or reopen an existing one".to_string());
    }

    SelectionError::NoActionable {
        message: format!("no pending work remains ({})", summary),
        context: ErrorContext {
            task_ids: blocked.iter().map(|n| n.id()).collect(),
            task_titles: blocked.iter().map(|n| n.task.label()).collect(),
            suggestions,
        },
    }
}
