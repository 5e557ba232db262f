//! Dependency graph for tasks
//!
//! Holds one [`DependencyNode`] per task plus derived metrics. Edges live in
//! a petgraph arena (node weight = task id, edge direction dependency ->
//! dependent) so traversals work on indices instead of pointers. The arena
//! preserves input order, which keeps every derived id list deterministic.

use chrono::{DateTime, Utc};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::task::Task;

/// A task plus its derived graph structure and metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyNode {
    pub task: Task,

    /// Dependency ids copied verbatim from the task
    pub dependencies: Vec<Uuid>,

    /// Tasks that list this one as a dependency
    pub dependents: Vec<Uuid>,

    /// Tasks whose parent is this one
    pub children: Vec<Uuid>,

    pub parent_id: Option<Uuid>,

    pub dependent_count: usize,
    pub child_count: usize,
    pub dependency_depth: u32,
    pub critical_path_length: u32,
    pub unblock_count: u32,
    pub hierarchy_depth: u32,
    pub is_actionable: bool,

    /// Human-readable reasons this task cannot be worked on
    pub blocking_reasons: Vec<String>,
}

impl DependencyNode {
    pub fn new(task: Task) -> Self {
        Self {
            dependencies: task.dependencies.clone(),
            parent_id: task.parent_id,
            task,
            dependents: Vec::new(),
            children: Vec::new(),
            dependent_count: 0,
            child_count: 0,
            dependency_depth: 0,
            critical_path_length: 0,
            unblock_count: 0,
            hierarchy_depth: 0,
            is_actionable: false,
            blocking_reasons: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.task.id
    }

    /// Records a blocking reason unless the same text is already present
    pub fn add_blocking_reason(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.blocking_reasons.contains(&reason) {
            self.blocking_reasons.push(reason);
        }
    }
}

/// Graph of all tasks in one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub nodes: HashMap<Uuid, DependencyNode>,

    /// Tasks with no dependencies
    pub root_tasks: Vec<Uuid>,

    /// Tasks nothing depends on
    pub leaf_tasks: Vec<Uuid>,

    /// Longest dependency chain found from any root
    pub critical_path: Vec<Uuid>,

    pub has_cycles: bool,

    /// Superset of the ids taking part in cycles; may contain duplicates
    pub cyclic_tasks: Vec<Uuid>,

    pub total_tasks: usize,
    pub actionable_count: usize,
    pub built_at: DateTime<Utc>,

    #[serde(skip)]
    arena: DiGraph<Uuid, ()>,

    #[serde(skip)]
    index: HashMap<Uuid, NodeIndex>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root_tasks: Vec::new(),
            leaf_tasks: Vec::new(),
            critical_path: Vec::new(),
            has_cycles: false,
            cyclic_tasks: Vec::new(),
            total_tasks: 0,
            actionable_count: 0,
            built_at: Utc::now(),
            arena: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a node; returns false if a node with the same id already exists
    pub(crate) fn insert_node(&mut self, node: DependencyNode) -> bool {
        let id = node.id();
        if self.index.contains_key(&id) {
            return false;
        }
        let idx = self.arena.add_node(id);
        self.index.insert(id, idx);
        self.nodes.insert(id, node);
        self.total_tasks = self.nodes.len();
        true
    }

    /// Adds an arena edge: `dependent` depends on `dependency`
    ///
    /// Both ids must already be nodes. Repeated edges collapse into one.
    pub(crate) fn link(&mut self, dependency: Uuid, dependent: Uuid) {
        if let (Some(&from), Some(&to)) = (self.index.get(&dependency), self.index.get(&dependent))
        {
            self.arena.update_edge(from, to, ());
        }
    }

    pub fn node(&self, id: &Uuid) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &Uuid) -> Option<&mut DependencyNode> {
        self.nodes.get_mut(id)
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, id: &Uuid) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Task ids in input order
    pub fn task_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.arena.node_indices().map(move |idx| self.arena[idx])
    }

    /// Nodes in input order
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &DependencyNode> + '_ {
        self.task_ids().filter_map(move |id| self.nodes.get(&id))
    }

    /// Cyclic ids with duplicates removed, in first-seen order
    pub fn unique_cyclic_tasks(&self) -> Vec<Uuid> {
        let mut seen = Vec::new();
        for id in &self.cyclic_tasks {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    pub(crate) fn arena_len(&self) -> usize {
        self.arena.node_count()
    }

    #[cfg(test)]
    pub(crate) fn index_of(&self, id: &Uuid) -> Option<usize> {
        self.index.get(id).map(|idx| idx.index())
    }

    pub(crate) fn id_at(&self, index: usize) -> Uuid {
        self.arena[NodeIndex::new(index)]
    }

    /// Arena indices of every task sitting on a dependency cycle, ascending
    pub(crate) fn cycle_member_indices(&self) -> Vec<usize> {
        let mut members: Vec<usize> = tarjan_scc(&self.arena)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.arena.contains_edge(component[0], component[0])
            })
            .flatten()
            .map(|idx| idx.index())
            .collect();
        members.sort_unstable();
        members
    }

    /// Arena indices of the tasks `index` depends on (resolved ids only)
    pub(crate) fn dependency_indices(&self, index: usize) -> Vec<usize> {
        self.neighbor_indices(index, Direction::Incoming)
    }

    /// Arena indices of the tasks depending on `index`
    pub(crate) fn dependent_indices(&self, index: usize) -> Vec<usize> {
        self.neighbor_indices(index, Direction::Outgoing)
    }

    fn neighbor_indices(&self, index: usize, direction: Direction) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .arena
            .neighbors_directed(NodeIndex::new(index), direction)
            .map(|idx| idx.index())
            .collect();
        // petgraph yields neighbors newest-first
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.task_ids().count(), 0);
        assert!(graph.root_tasks.is_empty());
        assert!(graph.cyclic_tasks.is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut graph = DependencyGraph::new();
        let task = Task::new("A");

        assert!(graph.insert_node(DependencyNode::new(task.clone())));
        assert!(!graph.insert_node(DependencyNode::new(task)));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.total_tasks, 1);
    }

    #[test]
    fn link_and_neighbors() {
        let mut graph = DependencyGraph::new();
        let a = Task::new("A");
        let b = Task::new("B");
        let (a_id, b_id) = (a.id, b.id);
        graph.insert_node(DependencyNode::new(a));
        graph.insert_node(DependencyNode::new(b));

        // b depends on a, twice
        graph.link(a_id, b_id);
        graph.link(a_id, b_id);

        let a_idx = graph.index_of(&a_id).unwrap();
        let b_idx = graph.index_of(&b_id).unwrap();
        assert_eq!(graph.dependent_indices(a_idx), vec![b_idx]);
        assert_eq!(graph.dependency_indices(b_idx), vec![a_idx]);
        assert_eq!(graph.id_at(b_idx), b_id);
    }

    #[test]
    fn task_ids_keep_input_order() {
        let mut graph = DependencyGraph::new();
        let tasks: Vec<_> = (0..5).map(|i| Task::new(format!("T{}", i))).collect();
        for task in &tasks {
            graph.insert_node(DependencyNode::new(task.clone()));
        }

        let ids: Vec<_> = graph.task_ids().collect();
        let expected: Vec<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn blocking_reasons_are_not_repeated() {
        let mut node = DependencyNode::new(Task::new("A"));
        node.add_blocking_reason("has active subtasks");
        node.add_blocking_reason("has active subtasks");
        assert_eq!(node.blocking_reasons.len(), 1);
    }

    #[test]
    fn unique_cyclic_tasks_dedups_in_order() {
        let mut graph = DependencyGraph::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        graph.cyclic_tasks = vec![a, b, a, b];
        assert_eq!(graph.unique_cyclic_tasks(), vec![a, b]);
    }
}
