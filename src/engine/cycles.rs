//! Cycle detection over dependency edges
//!
//! Three-color depth-first search, written as an explicit worklist so
//! malformed input cannot exhaust the call stack. Parent/child edges are
//! not considered.

use tracing::warn;
use uuid::Uuid;

use crate::domain::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleDetector;

impl CycleDetector {
    pub fn new() -> Self {
        Self
    }

    /// Sets `has_cycles` and `cyclic_tasks` on the graph
    pub fn detect(&self, graph: &mut DependencyGraph) {
        let cyclic = self.find_cyclic(graph);
        graph.has_cycles = !cyclic.is_empty();
        if graph.has_cycles {
            warn!(
                participants = unique_count(&cyclic),
                "dependency graph contains cycles"
            );
        }
        graph.cyclic_tasks = cyclic;
    }

    /// Returns the ids on every back edge's cycle, in discovery order
    ///
    /// For each back edge the closing node, the discovering node and the
    /// stack path between them are appended, so one id can appear more than
    /// once when it sits on several cycles. Cycle members that no back edge
    /// path passes through are appended last, from the strongly connected
    /// components of the dependency edges.
    pub fn find_cyclic(&self, graph: &DependencyGraph) -> Vec<Uuid> {
        let count = graph.arena_len();
        let mut color = vec![Color::White; count];
        let mut cyclic = Vec::new();

        for start in 0..count {
            if color[start] != Color::White {
                continue;
            }

            // (node, its dependencies, next dependency to visit)
            let mut stack: Vec<(usize, Vec<usize>, usize)> =
                vec![(start, graph.dependency_indices(start), 0)];
            color[start] = Color::Gray;

            while let Some((node, next)) = stack.last_mut().map(|frame| {
                let next = frame.1.get(frame.2).copied();
                frame.2 += 1;
                (frame.0, next)
            }) {
                match next {
                    Some(dep) => match color[dep] {
                        Color::White => {
                            color[dep] = Color::Gray;
                            stack.push((dep, graph.dependency_indices(dep), 0));
                        }
                        Color::Gray => {
                            // Back edge: dep is on the current path
                            let from = stack
                                .iter()
                                .position(|frame| frame.0 == dep)
                                .unwrap_or(stack.len() - 1);
                            cyclic.push(graph.id_at(dep));
                            for frame in &stack[from + 1..] {
                                cyclic.push(graph.id_at(frame.0));
                            }
                            if from + 1 >= stack.len() {
                                // Self-dependency
                                cyclic.push(graph.id_at(node));
                            }
                        }
                        Color::Black => {}
                    },
                    None => {
                        color[node] = Color::Black;
                        stack.pop();
                    }
                }
            }
        }

        for index in graph.cycle_member_indices() {
            let id = graph.id_at(index);
            if !cyclic.contains(&id) {
                cyclic.push(id);
            }
        }

        cyclic
    }
}

fn unique_count(ids: &[Uuid]) -> usize {
    let mut unique: Vec<&Uuid> = ids.iter().collect();
    unique.sort_unstable();
    unique.dedup();
    unique.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::engine::GraphBuilder;

    fn detect(tasks: &[Task]) -> DependencyGraph {
        let mut graph = GraphBuilder::new().build(tasks);
        CycleDetector::new().detect(&mut graph);
        graph
    }

    #[test]
    fn acyclic_chain() {
        let a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(b.id);

        let graph = detect(&[a, b, c]);
        assert!(!graph.has_cycles);
        assert!(graph.cyclic_tasks.is_empty());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(a.id);
        let d = Task::new("D").with_dependency(b.id).with_dependency(c.id);

        let graph = detect(&[d, c, b, a]);
        assert!(!graph.has_cycles);
    }

    #[test]
    fn self_dependency_is_a_one_node_cycle() {
        let mut a = Task::new("A");
        a.add_dependency(a.id);

        let graph = detect(&[a.clone()]);
        assert!(graph.has_cycles);
        assert_eq!(graph.unique_cyclic_tasks(), vec![a.id]);
    }

    #[test]
    fn every_member_of_a_long_cycle_is_reported() {
        let mut a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(b.id);
        let d = Task::new("D").with_dependency(c.id);
        a.add_dependency(d.id);
        let outside = Task::new("Outside").with_dependency(a.id);

        let graph = detect(&[a.clone(), b.clone(), c.clone(), d.clone(), outside.clone()]);
        assert!(graph.has_cycles);
        for id in [a.id, b.id, c.id, d.id] {
            assert!(graph.cyclic_tasks.contains(&id), "missing {}", id);
        }
        assert!(!graph.cyclic_tasks.contains(&outside.id));
    }

    #[test]
    fn members_behind_a_shortcut_are_reported() {
        // A -> B -> C -> D -> A, with D also depending on B directly
        let mut a = Task::new("A");
        let b = Task::new("B").with_dependency(a.id);
        let c = Task::new("C").with_dependency(b.id);
        let d = Task::new("D").with_dependency(b.id).with_dependency(c.id);
        a.add_dependency(d.id);

        let graph = detect(&[a.clone(), b.clone(), c.clone(), d.clone()]);
        let cyclic = graph.unique_cyclic_tasks();
        assert_eq!(cyclic.len(), 4);
        for id in [a.id, b.id, c.id, d.id] {
            assert!(cyclic.contains(&id));
        }
    }

    #[test]
    fn cycles_ignore_parent_edges() {
        let parent = Task::new("Parent");
        let child = Task::new("Child").with_parent(parent.id);
        let mut parent = parent;
        parent.parent_id = Some(child.id);

        let graph = detect(&[parent, child]);
        assert!(!graph.has_cycles);
    }

    #[test]
    fn missing_dependencies_do_not_form_cycles() {
        let a = Task::new("A").with_dependency(uuid::Uuid::new_v4());
        let graph = detect(&[a]);
        assert!(!graph.has_cycles);
    }
}
