//! Per-node graph metrics
//!
//! All traversals are iterative post-order walks over the arena with a
//! per-build memo. A neighbor still on the walk stack closes a cycle and
//! contributes as if its value were zero, so cyclic or malformed graphs
//! always terminate.

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::{Behavior, DependencyGraph, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Memoized post-order fold over the arena
///
/// `successors(n)` names the nodes whose values `n` depends on. `combine`
/// receives the node and each successor's value, or `None` when the
/// successor closes a cycle.
fn fold_post_order<S, C>(count: usize, successors: S, combine: C) -> Vec<u32>
where
    S: Fn(usize) -> Vec<usize>,
    C: Fn(usize, &[Option<u32>]) -> u32,
{
    let mut marks = vec![Mark::Unvisited; count];
    let mut values = vec![0u32; count];

    for start in 0..count {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(start, successors(start), 0)];
        marks[start] = Mark::OnStack;

        while let Some(frame) = stack.last_mut() {
            if let Some(&next) = frame.1.get(frame.2) {
                frame.2 += 1;
                if marks[next] == Mark::Unvisited {
                    marks[next] = Mark::OnStack;
                    let succ = successors(next);
                    stack.push((next, succ, 0));
                }
                continue;
            }

            let (node, succ, _) = match stack.pop() {
                Some(frame) => frame,
                None => break,
            };
            let inputs: Vec<Option<u32>> = succ
                .iter()
                .map(|&s| match marks[s] {
                    Mark::Done => Some(values[s]),
                    _ => None,
                })
                .collect();
            values[node] = combine(node, &inputs);
            marks[node] = Mark::Done;
        }
    }

    values
}

fn cap(value: u32, max_depth: u32) -> u32 {
    if max_depth == 0 {
        value
    } else {
        value.min(max_depth)
    }
}

/// Computes dependency depth, critical-path length, unblock count and
/// hierarchy depth for every node, plus the graph-level critical path
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    max_depth: u32,
    behavior: Behavior,
}

impl MetricsCalculator {
    pub fn new(max_depth: u32, behavior: Behavior) -> Self {
        Self {
            max_depth,
            behavior,
        }
    }

    pub fn calculate(&self, graph: &mut DependencyGraph) {
        let depths = self.dependency_depths(graph);
        let critical = self.critical_path_lengths(graph);
        let unblocks = self.unblock_counts(graph);

        let ids: Vec<Uuid> = graph.task_ids().collect();
        let hierarchy: Vec<u32> = ids.iter().map(|id| hierarchy_depth(graph, id)).collect();

        for (index, id) in ids.iter().enumerate() {
            if let Some(node) = graph.node_mut(id) {
                node.dependency_depth = depths[index];
                node.critical_path_length = critical[index];
                node.unblock_count = unblocks[index];
                node.hierarchy_depth = hierarchy[index];
            }
        }

        graph.critical_path = graph_critical_path(graph);
    }

    /// Longest chain of dependencies below each node, 0 with none
    pub fn dependency_depths(&self, graph: &DependencyGraph) -> Vec<u32> {
        let max_depth = self.max_depth;
        fold_post_order(
            graph.arena_len(),
            |n| graph.dependency_indices(n),
            |_, inputs| {
                let longest = inputs
                    .iter()
                    .map(|v| v.unwrap_or(0).saturating_add(1))
                    .max()
                    .unwrap_or(0);
                cap(longest, max_depth)
            },
        )
    }

    /// Longest chain of dependents starting at each node, counting itself
    pub fn critical_path_lengths(&self, graph: &DependencyGraph) -> Vec<u32> {
        let max_depth = self.max_depth;
        let chains = fold_post_order(
            graph.arena_len(),
            |n| graph.dependent_indices(n),
            |_, inputs| {
                let longest = inputs
                    .iter()
                    .map(|v| v.unwrap_or(0).saturating_add(1))
                    .max()
                    .unwrap_or(0);
                cap(longest, max_depth)
            },
        );
        chains.into_iter().map(|chain| chain + 1).collect()
    }

    /// How many blocked tasks completing each node would release, transitively
    pub fn unblock_counts(&self, graph: &DependencyGraph) -> Vec<u32> {
        fold_post_order(
            graph.arena_len(),
            |n| {
                graph
                    .dependent_indices(n)
                    .into_iter()
                    .filter(|&d| self.would_unblock(graph, n, d))
                    .collect()
            },
            |_, inputs| {
                inputs
                    .iter()
                    .map(|v| v.unwrap_or(0).saturating_add(1))
                    .fold(0u32, u32::saturating_add)
            },
        )
    }

    /// True if completing `completing` leaves `dependent` free to start
    fn would_unblock(&self, graph: &DependencyGraph, completing: usize, dependent: usize) -> bool {
        let completing_id = graph.id_at(completing);
        let node = match graph.node(&graph.id_at(dependent)) {
            Some(node) => node,
            None => return false,
        };
        if node.task.status != TaskStatus::Pending {
            return false;
        }

        let others_done = node
            .dependencies
            .iter()
            .filter(|dep| **dep != completing_id)
            .all(|dep| match graph.node(dep) {
                Some(dep_node) => dep_node.task.status.is_complete(),
                None => !self.behavior.strict_dependencies,
            });
        if !others_done {
            return false;
        }

        self.behavior.allow_parent_with_subtasks || !has_active_children(graph, node.id())
    }
}

pub(crate) fn has_active_children(graph: &DependencyGraph, id: Uuid) -> bool {
    graph.node(&id).is_some_and(|node| {
        node.children.iter().any(|child| {
            graph
                .node(child)
                .is_some_and(|c| c.task.status.is_workable())
        })
    })
}

/// Parent hops from `id` to its top-level ancestor
pub fn hierarchy_depth(graph: &DependencyGraph, id: &Uuid) -> u32 {
    let mut visited = HashSet::new();
    visited.insert(*id);

    let mut depth = 0;
    let mut current = graph.node(id).and_then(|node| node.parent_id);
    while let Some(parent_id) = current {
        if !visited.insert(parent_id) {
            break;
        }
        match graph.node(&parent_id) {
            Some(parent) => {
                depth += 1;
                current = parent.parent_id;
            }
            None => break,
        }
    }
    depth
}

/// Greedy longest chain of dependents starting from any root
///
/// Requires `critical_path_length` to be filled in on every node.
fn graph_critical_path(graph: &DependencyGraph) -> Vec<Uuid> {
    let mut best: Vec<Uuid> = Vec::new();

    for root in &graph.root_tasks {
        let mut chain = vec![*root];
        let mut visited: HashSet<Uuid> = HashSet::from([*root]);
        let mut current = *root;

        loop {
            let next = graph.node(&current).and_then(|node| {
                node.dependents
                    .iter()
                    .filter(|d| !visited.contains(*d))
                    .filter_map(|d| graph.node(d))
                    // max_by_key keeps the last maximum, so walk in reverse
                    .rev()
                    .max_by_key(|d| d.critical_path_length)
                    .map(|d| d.id())
            });
            match next {
                Some(next) => {
                    visited.insert(next);
                    chain.push(next);
                    current = next;
                }
                None => break,
            }
        }

        if chain.len() > best.len() {
            best = chain;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::engine::GraphBuilder;

    fn calculated(tasks: &[Task], behavior: Behavior) -> DependencyGraph {
        let mut graph = GraphBuilder::new().build(tasks);
        MetricsCalculator::new(10, behavior).calculate(&mut graph);
        graph
    }

    fn chain(len: usize) -> Vec<Task> {
        let mut tasks: Vec<Task> = Vec::new();
        for i in 0..len {
            let mut task = Task::new(format!("T{}", i));
            if let Some(prev) = tasks.last() {
                task.add_dependency(prev.id);
            }
            tasks.push(task);
        }
        tasks
    }

    #[test]
    fn linear_chain_depths() {
        let tasks = chain(3);
        let graph = calculated(&tasks, Behavior::default());

        let depth = |i: usize| graph.node(&tasks[i].id).unwrap().dependency_depth;
        let critical = |i: usize| graph.node(&tasks[i].id).unwrap().critical_path_length;

        assert_eq!((depth(0), depth(1), depth(2)), (0, 1, 2));
        assert_eq!((critical(0), critical(1), critical(2)), (3, 2, 1));
        assert_eq!(
            graph.critical_path,
            tasks.iter().map(|t| t.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn linear_chain_unblocks_transitively() {
        let tasks = chain(3);
        let graph = calculated(&tasks, Behavior::default());

        // Completing T0 releases T1, which would in turn release T2
        assert_eq!(graph.node(&tasks[0].id).unwrap().unblock_count, 2);
        assert_eq!(graph.node(&tasks[1].id).unwrap().unblock_count, 1);
        assert_eq!(graph.node(&tasks[2].id).unwrap().unblock_count, 0);
    }

    #[test]
    fn depth_is_capped() {
        let tasks = chain(20);
        let mut graph = GraphBuilder::new().build(&tasks);
        MetricsCalculator::new(5, Behavior::default()).calculate(&mut graph);

        assert_eq!(graph.node(&tasks[19].id).unwrap().dependency_depth, 5);
        assert_eq!(graph.node(&tasks[0].id).unwrap().critical_path_length, 6);

        let mut graph = GraphBuilder::new().build(&tasks);
        MetricsCalculator::new(0, Behavior::default()).calculate(&mut graph);
        assert_eq!(graph.node(&tasks[19].id).unwrap().dependency_depth, 19);
    }

    #[test]
    fn diamond_depth_is_order_independent() {
        let a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(b.id);
        let d = Task::new("D").with_dependency(a.id);
        let e = Task::new("E").with_dependency(d.id).with_dependency(c.id);

        let forward = calculated(
            &[a.clone(), b.clone(), c.clone(), d.clone(), e.clone()],
            Behavior::default(),
        );
        let backward = calculated(
            &[e.clone(), d.clone(), c.clone(), b.clone(), a.clone()],
            Behavior::default(),
        );

        assert_eq!(forward.node(&e.id).unwrap().dependency_depth, 3);
        assert_eq!(backward.node(&e.id).unwrap().dependency_depth, 3);
        assert_eq!(forward.node(&a.id).unwrap().critical_path_length, 4);
        assert_eq!(backward.node(&a.id).unwrap().critical_path_length, 4);
    }

    #[test]
    fn fan_out_unblock() {
        let u = Task::new("U");
        let deps: Vec<Task> = (0..3)
            .map(|i| Task::new(format!("D{}", i)).with_dependency(u.id))
            .collect();
        let mut tasks = vec![u.clone()];
        tasks.extend(deps);

        let graph = calculated(&tasks, Behavior::default());
        assert_eq!(graph.node(&u.id).unwrap().unblock_count, 3);
        assert_eq!(graph.node(&u.id).unwrap().dependent_count, 3);
    }

    #[test]
    fn unblock_requires_other_dependencies_completed() {
        let a = Task::new("A");
        let other = Task::new("Other");
        let both = Task::new("Both").with_dependency(a.id).with_dependency(other.id);

        let graph = calculated(&[a.clone(), other.clone(), both.clone()], Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 0);

        let done = other.clone().with_status(TaskStatus::Completed);
        let graph = calculated(&[a.clone(), done, both], Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 1);
    }

    #[test]
    fn unblock_skips_non_pending_dependents() {
        let a = Task::new("A");
        let started = Task::new("Started")
            .with_dependency(a.id)
            .with_status(TaskStatus::InProgress);

        let graph = calculated(&[a.clone(), started], Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 0);
    }

    #[test]
    fn unblock_respects_active_subtasks() {
        let a = Task::new("A");
        let parent = Task::new("Parent").with_dependency(a.id);
        let child = Task::new("Child").with_parent(parent.id);
        let tasks = [a.clone(), parent, child];

        let graph = calculated(&tasks, Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 0);

        let lenient = Behavior {
            allow_parent_with_subtasks: true,
            ..Behavior::default()
        };
        let graph = calculated(&tasks, lenient);
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 1);
    }

    #[test]
    fn missing_dependency_blocks_unblock_only_when_strict() {
        let a = Task::new("A");
        let b = Task::new("B")
            .with_dependency(a.id)
            .with_dependency(Uuid::new_v4());

        let graph = calculated(&[a.clone(), b.clone()], Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 0);

        let lenient = Behavior {
            strict_dependencies: false,
            ..Behavior::default()
        };
        let graph = calculated(&[a.clone(), b], lenient);
        assert_eq!(graph.node(&a.id).unwrap().unblock_count, 1);
    }

    #[test]
    fn hierarchy_depth_counts_parent_hops() {
        let root = Task::new("Root");
        let mid = Task::new("Mid").with_parent(root.id);
        let leaf = Task::new("Leaf").with_parent(mid.id);

        let graph = calculated(&[root.clone(), mid.clone(), leaf.clone()], Behavior::default());
        assert_eq!(graph.node(&root.id).unwrap().hierarchy_depth, 0);
        assert_eq!(graph.node(&mid.id).unwrap().hierarchy_depth, 1);
        assert_eq!(graph.node(&leaf.id).unwrap().hierarchy_depth, 2);
    }

    #[test]
    fn hierarchy_depth_survives_parent_cycles() {
        let mut a = Task::new("A");
        let b = Task::new("B").with_parent(a.id);
        a.parent_id = Some(b.id);

        let graph = calculated(&[a.clone(), b.clone()], Behavior::default());
        assert_eq!(graph.node(&a.id).unwrap().hierarchy_depth, 1);
        assert_eq!(graph.node(&b.id).unwrap().hierarchy_depth, 1);
    }

    #[test]
    fn cyclic_graph_terminates() {
        let mut a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(b.id);
        a.add_dependency(c.id);

        let graph = calculated(&[a.clone(), b, c], Behavior::default());
        let node = graph.node(&a.id).unwrap();
        assert!(node.dependency_depth <= 10);
        assert!(node.critical_path_length >= 1);
        // Every node has a dependency, so there are no roots to walk from
        assert!(graph.critical_path.is_empty());
    }
}
