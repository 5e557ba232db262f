//! Property tests over randomly generated task snapshots

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use taskpick::engine::{DependencyAnalyzer, ErrorKind, TaskSelector};
use taskpick::{Priority, SelectorConfig, Strategy as Policy, Task, TaskStatus};
use uuid::Uuid;

const STATUSES: [TaskStatus; 6] = [
    TaskStatus::Pending,
    TaskStatus::Pending,
    TaskStatus::InProgress,
    TaskStatus::Completed,
    TaskStatus::Blocked,
    TaskStatus::Cancelled,
];

const PRIORITIES: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

type Shape = (usize, usize, Vec<bool>, Option<usize>);

/// Builds an acyclic snapshot: task `i` may only depend on or nest under `j < i`
fn build(shapes: Vec<Shape>) -> Vec<Task> {
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let ids: Vec<Uuid> = (0..shapes.len())
        .map(|i| Uuid::from_u128(i as u128 + 1))
        .collect();

    shapes
        .into_iter()
        .enumerate()
        .map(|(i, (status, priority, mask, parent))| {
            let mut task = Task::with_id(ids[i], format!("T{}", i))
                .with_created_at(base + Duration::minutes(i as i64))
                .with_status(STATUSES[status])
                .with_priority(PRIORITIES[priority]);
            for (j, linked) in mask.iter().enumerate().take(i) {
                if *linked {
                    task.add_dependency(ids[j]);
                }
            }
            if let Some(p) = parent.filter(|p| *p < i) {
                task = task.with_parent(ids[p]);
            }
            task
        })
        .collect()
}

fn snapshot() -> impl Strategy<Value = Vec<Task>> {
    (1usize..12)
        .prop_flat_map(|n| {
            prop::collection::vec(
                (
                    0usize..STATUSES.len(),
                    0usize..PRIORITIES.len(),
                    prop::collection::vec(prop::bool::weighted(0.3), n),
                    prop::option::of(0usize..n),
                ),
                n,
            )
        })
        .prop_map(build)
}

fn policy() -> impl Strategy<Value = Policy> {
    prop::sample::select(Policy::ALL.to_vec())
}

/// Checks the selected task against the raw snapshot
fn assert_startable(tasks: &[Task], picked: &Task) {
    assert!(picked.status.is_workable(), "{} is {}", picked.title, picked.status);
    for dep in &picked.dependencies {
        let dep = tasks.iter().find(|t| t.id == *dep).unwrap();
        assert_eq!(dep.status, TaskStatus::Completed, "{} waits on {}", picked.title, dep.title);
    }
    let open_child = tasks
        .iter()
        .any(|t| t.parent_id == Some(picked.id) && t.status.is_workable());
    assert!(!open_child, "{} still has open subtasks", picked.title);
}

proptest! {
    #[test]
    fn analysis_is_idempotent(tasks in snapshot()) {
        let analyzer = DependencyAnalyzer::new(SelectorConfig::default());
        let first = analyzer.build_uncached(&tasks);
        let second = analyzer.build_uncached(&tasks);

        prop_assert_eq!(&first.nodes, &second.nodes);
        prop_assert_eq!(&first.root_tasks, &second.root_tasks);
        prop_assert_eq!(&first.leaf_tasks, &second.leaf_tasks);
        prop_assert_eq!(&first.critical_path, &second.critical_path);
        prop_assert_eq!(first.actionable_count, second.actionable_count);
    }

    #[test]
    fn forward_only_snapshots_have_no_cycles(tasks in snapshot()) {
        let graph = DependencyAnalyzer::new(SelectorConfig::default()).build_uncached(&tasks);
        prop_assert!(!graph.has_cycles);
        prop_assert!(graph.cyclic_tasks.is_empty());
    }

    #[test]
    fn closing_a_chain_is_reported(tasks in snapshot()) {
        let mut tasks = tasks;
        let first = tasks[0].id;
        let last = tasks[tasks.len() - 1].id;

        // Link every task to its predecessor, then the first back to the last
        for i in 1..tasks.len() {
            let prev = tasks[i - 1].id;
            tasks[i].add_dependency(prev);
        }
        tasks[0].add_dependency(last);

        let graph = DependencyAnalyzer::new(SelectorConfig::default()).build_uncached(&tasks);
        prop_assert!(graph.has_cycles);
        let cyclic = graph.unique_cyclic_tasks();
        for task in &tasks {
            prop_assert!(cyclic.contains(&task.id));
        }
        prop_assert!(cyclic.contains(&first));
    }

    #[test]
    fn actionability_matches_definition(
        tasks in snapshot(),
        strict in any::<bool>(),
        allow_parent in any::<bool>(),
        dangling in any::<bool>(),
    ) {
        let mut tasks = tasks;
        if dangling {
            tasks[0].add_dependency(Uuid::from_u128(u128::MAX));
        }
        let mut config = SelectorConfig::default();
        config.behavior.strict_dependencies = strict;
        config.behavior.allow_parent_with_subtasks = allow_parent;

        let graph = DependencyAnalyzer::new(config).build_uncached(&tasks);
        for task in &tasks {
            let dependencies_met = task.dependencies.iter().all(|d| {
                match tasks.iter().find(|t| t.id == *d) {
                    Some(dep) => dep.status == TaskStatus::Completed,
                    None => !strict,
                }
            });
            let open_child = tasks
                .iter()
                .any(|t| t.parent_id == Some(task.id) && t.status.is_workable());
            let expected =
                task.status.is_workable() && dependencies_met && (allow_parent || !open_child);

            prop_assert_eq!(graph.node(&task.id).unwrap().is_actionable, expected, "{}", task.title);
        }
    }

    #[test]
    fn selected_task_is_startable(tasks in snapshot(), strategy in policy()) {
        let selector = TaskSelector::new(SelectorConfig::default().with_strategy(strategy)).unwrap();
        match selector.select(&tasks) {
            Ok(result) => {
                assert_startable(&tasks, &result.task);
                for alt in &result.alternatives {
                    assert_startable(&tasks, &alt.task);
                }
            }
            Err(err) => prop_assert!(
                matches!(err.kind(), ErrorKind::NoActionable | ErrorKind::Deadlock),
                "unexpected {}",
                err
            ),
        }
    }

    #[test]
    fn completion_order_respects_dependencies(tasks in snapshot(), strategy in policy()) {
        let mut tasks = tasks;
        let selector = TaskSelector::new(SelectorConfig::default().with_strategy(strategy)).unwrap();

        for _ in 0..=tasks.len() {
            let Ok(picked) = selector.select_next_actionable_task(&tasks) else {
                break;
            };
            assert_startable(&tasks, &picked);
            if let Some(t) = tasks.iter_mut().find(|t| t.id == picked.id) {
                t.complete();
            }
        }
        prop_assert!(selector.select(&tasks).is_err());
    }
}
