//! Graph construction from a flat task list

use tracing::warn;
use uuid::Uuid;

use crate::domain::{DependencyGraph, DependencyNode, Task};

/// Reason recorded on a node whose dependency id resolves to nothing
pub fn missing_dependency_reason(dependency: &Uuid) -> String {
    format!("dependency {} not found", dependency)
}

/// Builds the node/edge structure of a [`DependencyGraph`]
///
/// Only structure is filled in: dependents, children, roots and leaves.
/// Cycle flags and metrics are left for the later passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, tasks: &[Task]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        // First pass: add all nodes
        for task in tasks {
            if !graph.insert_node(DependencyNode::new(task.clone())) {
                warn!(task_id = %task.id, "duplicate task id in input, keeping first occurrence");
            }
        }

        let ids: Vec<Uuid> = graph.task_ids().collect();

        // Second pass: dependency edges
        for id in &ids {
            let dependencies = match graph.node(id) {
                Some(node) => node.dependencies.clone(),
                None => continue,
            };

            for dependency in dependencies {
                match graph.node_mut(&dependency) {
                    Some(target) => {
                        if !target.dependents.contains(id) {
                            target.dependents.push(*id);
                        }
                        graph.link(dependency, *id);
                    }
                    None => {
                        if let Some(node) = graph.node_mut(id) {
                            node.add_blocking_reason(missing_dependency_reason(&dependency));
                        }
                    }
                }
            }
        }

        // Third pass: parent/child edges
        for id in &ids {
            let parent_id = match graph.node(id).and_then(|node| node.parent_id) {
                Some(parent_id) => parent_id,
                None => continue,
            };
            if let Some(parent) = graph.node_mut(&parent_id) {
                if !parent.children.contains(id) {
                    parent.children.push(*id);
                }
            }
        }

        for id in &ids {
            if let Some(node) = graph.node_mut(id) {
                node.dependent_count = node.dependents.len();
                node.child_count = node.children.len();
            }
        }

        graph.root_tasks = ids
            .iter()
            .filter(|id| graph.node(id).is_some_and(|n| n.dependencies.is_empty()))
            .copied()
            .collect();
        graph.leaf_tasks = ids
            .iter()
            .filter(|id| graph.node(id).is_some_and(|n| n.dependents.is_empty()))
            .copied()
            .collect();

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_empty_graph() {
        let graph = GraphBuilder::new().build(&[]);
        assert!(graph.is_empty());
        assert_eq!(graph.total_tasks, 0);
        assert!(graph.root_tasks.is_empty());
        assert!(graph.leaf_tasks.is_empty());
        assert!(graph.critical_path.is_empty());
    }

    #[test]
    fn dependents_are_reverse_edges() {
        let a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(a.id);

        let graph = GraphBuilder::new().build(&[a.clone(), b.clone(), c.clone()]);

        let node_a = graph.node(&a.id).unwrap();
        assert_eq!(node_a.dependents, vec![b.id, c.id]);
        assert_eq!(node_a.dependent_count, 2);
        assert_eq!(graph.root_tasks, vec![a.id]);
        assert_eq!(graph.leaf_tasks, vec![b.id, c.id]);
    }

    #[test]
    fn missing_dependency_is_recorded_not_fatal() {
        let ghost = Uuid::new_v4();
        let a = Task::new("A").with_dependency(ghost);

        let graph = GraphBuilder::new().build(&[a.clone()]);

        let node = graph.node(&a.id).unwrap();
        assert_eq!(node.blocking_reasons, vec![missing_dependency_reason(&ghost)]);
        // Declared dependencies are copied verbatim, so it is not a root
        assert!(graph.root_tasks.is_empty());
        assert_eq!(graph.leaf_tasks, vec![a.id]);
    }

    #[test]
    fn children_built_from_parent_pointers() {
        let parent = Task::new("Parent");
        let child1 = Task::new("Child 1").with_parent(parent.id);
        let child2 = Task::new("Child 2").with_parent(parent.id);
        let orphan = Task::new("Orphan").with_parent(Uuid::new_v4());

        let graph = GraphBuilder::new().build(&[
            parent.clone(),
            child1.clone(),
            child2.clone(),
            orphan.clone(),
        ]);

        let node = graph.node(&parent.id).unwrap();
        assert_eq!(node.children, vec![child1.id, child2.id]);
        assert_eq!(node.child_count, 2);
        assert_eq!(graph.node(&child1.id).unwrap().parent_id, Some(parent.id));
        assert!(graph.node(&orphan.id).unwrap().parent_id.is_some());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let a = Task::new("First");
        let mut dup = a.clone();
        dup.title = "Second".to_string();

        let graph = GraphBuilder::new().build(&[a.clone(), dup]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(&a.id).unwrap().task.title, "First");
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let a = Task::new("A");
        let mut b = Task::new("B");
        b.dependencies = vec![a.id, a.id];

        let graph = GraphBuilder::new().build(&[a.clone(), b.clone()]);
        assert_eq!(graph.node(&a.id).unwrap().dependents, vec![b.id]);
        assert_eq!(graph.node(&b.id).unwrap().dependencies.len(), 2);
    }
}
