//! Next-task selection
//!
//! [`TaskSelector`] runs the whole pipeline: analysis, cycle rejection,
//! actionable filtering, scoring, thresholding and ranking.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    DependencyGraph, DependencyNode, Priority, SelectorConfig, Strategy, Task,
};

use super::analyzer::DependencyAnalyzer;
use super::builder::GraphBuilder;
use super::cache::{CacheKey, GraphCache};
use super::cycles::CycleDetector;
use super::error::{ErrorContext, Result, SelectionError, ValidationError, ValidationKind};
use super::filter::TaskFilter;
use super::strategy::{self, TaskScore};

/// Below this many tasks ordering by creation is good enough
const SMALL_PROJECT_TASKS: usize = 5;

/// Outcome of a successful selection
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub task: Task,
    pub score: TaskScore,

    /// Remaining candidates, best first
    pub alternatives: Vec<TaskScore>,

    pub reason: String,
    pub strategy: Strategy,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct TaskSelector {
    config: SelectorConfig,
    analyzer: DependencyAnalyzer,
    filter: TaskFilter,
    strategy: Strategy,
}

impl TaskSelector {
    /// Creates a selector, rejecting an invalid configuration
    ///
    /// When `advanced.cache_enabled` is set the selector gets its own cache
    /// with the configured TTL.
    pub fn new(config: SelectorConfig) -> Result<Self> {
        Self::assemble(config, None)
    }

    /// Creates a selector that shares `cache` for graphs and scores
    pub fn with_cache(config: SelectorConfig, cache: Arc<GraphCache>) -> Result<Self> {
        Self::assemble(config, Some(cache))
    }

    fn assemble(config: SelectorConfig, cache: Option<Arc<GraphCache>>) -> Result<Self> {
        config.validate()?;
        let strategy = strategy::resolve_strategy(&config)?;
        let cache = cache.or_else(|| {
            config
                .advanced
                .cache_enabled
                .then(|| Arc::new(GraphCache::from_config(&config)))
        });
        let analyzer = match cache {
            Some(cache) => DependencyAnalyzer::with_cache(config.clone(), cache),
            None => DependencyAnalyzer::new(config.clone()),
        };

        Ok(Self {
            config,
            analyzer,
            filter: TaskFilter::new(),
            strategy,
        })
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Switches strategy; on error the selector is left untouched
    pub fn set_strategy(&mut self, strategy: Strategy) -> Result<()> {
        let config = self.config.clone().with_strategy(strategy);
        self.set_config(config)
    }

    /// Replaces the configuration; on error the selector is left untouched
    ///
    /// The current cache is kept unless the new configuration asks for a
    /// different TTL, in which case a fresh cache replaces it.
    pub fn set_config(&mut self, config: SelectorConfig) -> Result<()> {
        let ttl = Duration::from_secs(config.advanced.cache_duration_secs);
        let cache = self.analyzer.cache().filter(|c| c.ttl() == ttl).cloned();
        let rebuilt = Self::assemble(config, cache)?;
        *self = rebuilt;
        Ok(())
    }

    /// Picks the single best task to work on next
    pub fn select_next_actionable_task(&self, tasks: &[Task]) -> Result<Task> {
        self.select(tasks).map(|result| result.task)
    }

    /// Picks the best task and reports how it was chosen
    pub fn select(&self, tasks: &[Task]) -> Result<SelectionResult> {
        let started = Instant::now();
        if tasks.is_empty() {
            return Err(SelectionError::NoTasks);
        }

        let key = self
            .analyzer
            .active_cache()
            .map(|_| self.analyzer.cache_key(tasks));
        let graph = self.analyzer.build_keyed(tasks, key.as_ref());
        if graph.has_cycles {
            return Err(circular_dependency(&graph));
        }

        let candidates = self.filter.actionable(&graph)?;

        let mut scores: Vec<TaskScore> = candidates
            .iter()
            .filter_map(|node| self.score_candidate(&graph, node, key.as_ref()))
            .collect();

        let threshold = self.config.advanced.score_threshold;
        if threshold > 0.0 {
            let before = scores.len();
            scores.retain(|s| s.score >= threshold);
            debug!(threshold, dropped = before - scores.len(), "applied score threshold");
            if scores.is_empty() {
                return Err(below_threshold(&candidates, threshold));
            }
        }

        self.rank(&mut scores);

        let winner_at = if self.config.behavior.prefer_in_progress {
            scores.iter().position(TaskScore::is_in_progress).unwrap_or(0)
        } else {
            0
        };
        let winner = scores.remove(winner_at);
        let elapsed = started.elapsed();

        info!(
            task = %winner.task.id,
            title = %winner.task.title,
            strategy = %self.strategy,
            score = winner.score,
            candidates = scores.len() + 1,
            elapsed_us = elapsed.as_micros() as u64,
            "selected next task"
        );

        Ok(SelectionResult {
            task: winner.task.clone(),
            reason: winner.reason.clone(),
            score: winner,
            alternatives: scores,
            strategy: self.strategy,
            elapsed,
        })
    }

    /// Scores every task in `tasks`, best first
    pub fn score_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskScore>> {
        if tasks.is_empty() {
            return Err(SelectionError::NoTasks);
        }

        let graph = self.analyzer.build_dependency_graph(tasks);
        let mut scores: Vec<TaskScore> = graph
            .nodes_in_order()
            .filter_map(|node| self.analyzer.score_task(&graph, &node.id(), self.strategy))
            .collect();
        self.rank(&mut scores);
        Ok(scores)
    }

    fn score_candidate(
        &self,
        graph: &DependencyGraph,
        node: &DependencyNode,
        key: Option<&CacheKey>,
    ) -> Option<TaskScore> {
        let id = node.id();
        let cache = self.analyzer.active_cache().zip(key);

        if let Some((cache, key)) = cache {
            if let Some(hit) = cache.get_score(key, &id) {
                return Some(hit);
            }
        }

        let scored = self.analyzer.score_task(graph, &id, self.strategy)?;
        if let Some((cache, key)) = cache {
            cache.insert_score(key, scored.clone());
        }
        Some(scored)
    }

    fn rank(&self, scores: &mut [TaskScore]) {
        let by_creation = self.config.behavior.break_ties_by_creation;
        scores.sort_by(|a, b| compare_scores(a, b, by_creation));
    }
}

/// Higher score first, then older task when `by_creation`, then id
fn compare_scores(a: &TaskScore, b: &TaskScore, by_creation: bool) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            if by_creation {
                a.task.created_at.cmp(&b.task.created_at)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.task.id.cmp(&b.task.id))
}

fn circular_dependency(graph: &DependencyGraph) -> SelectionError {
    let ids = graph.unique_cyclic_tasks();
    let titles: Vec<String> = ids
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|n| n.task.label())
        .collect();

    let mut suggestions = Vec::new();
    for id in &ids {
        let Some(node) = graph.node(id) else { continue };
        for dep in node.dependencies.iter().filter(|d| ids.contains(d)) {
            let dep_label = graph
                .node(dep)
                .map(|n| n.task.label())
                .unwrap_or_else(|| dep.to_string());
            suggestions.push(format!(
                "Remove the dependency of '{}' on '{}'",
                node.task.label(),
                dep_label
            ));
        }
    }
    suggestions.push("Break every cycle before asking for the next task".to_string());

    SelectionError::CircularDependency {
        context: ErrorContext {
            task_ids: ids,
            task_titles: titles,
            suggestions,
        },
    }
}

fn below_threshold(candidates: &[&DependencyNode], threshold: f64) -> SelectionError {
    SelectionError::NoActionable {
        message: format!(
            "{} actionable task(s) but none scores at least {}",
            candidates.len(),
            threshold
        ),
        context: ErrorContext {
            task_ids: candidates.iter().map(|n| n.id()).collect(),
            task_titles: candidates.iter().map(|n| n.task.label()).collect(),
            suggestions: vec!["Lower advanced.score_threshold or pick another strategy".to_string()],
        },
    }
}

/// Scores every task under `strategy`, best first
pub fn score_tasks(
    tasks: &[Task],
    strategy: Strategy,
    config: &SelectorConfig,
) -> Result<Vec<TaskScore>> {
    TaskSelector::new(config.clone().with_strategy(strategy))?.score_tasks(tasks)
}

/// Reports circular and missing dependencies without selecting anything
///
/// Findings come in input order: cycle members first, then each missing
/// dependency of each task.
pub fn validate_task_dependencies(tasks: &[Task]) -> Result<Vec<ValidationError>> {
    let mut graph = GraphBuilder::new().build(tasks);
    CycleDetector::new().detect(&mut graph);

    let mut findings: Vec<ValidationError> = graph
        .unique_cyclic_tasks()
        .into_iter()
        .map(|id| ValidationError {
            kind: ValidationKind::CircularDependency,
            task_id: id,
            related_id: None,
            message: format!("task {} is part of a circular dependency", id),
        })
        .collect();

    for task in tasks {
        for dep in task.dependencies.iter().filter(|d| !graph.contains(d)) {
            findings.push(ValidationError {
                kind: ValidationKind::MissingDependency,
                task_id: task.id,
                related_id: Some(*dep),
                message: format!("task {} depends on missing task {}", task.id, dep),
            });
        }
    }

    debug!(tasks = tasks.len(), findings = findings.len(), "validated dependencies");
    Ok(findings)
}

/// Suggests a strategy from the shape of the project
pub fn recommend_strategy(tasks: &[Task]) -> Result<(Strategy, String)> {
    let total = tasks.len();
    if total == 0 {
        return Err(SelectionError::NoTasks);
    }
    if total < SMALL_PROJECT_TASKS {
        return Ok((
            Strategy::CreationOrder,
            format!("Small project ({} tasks): creation order is enough", total),
        ));
    }

    let n = total as f64;
    let with_dependencies = tasks.iter().filter(|t| !t.dependencies.is_empty()).count();
    let dependency_total: usize = tasks.iter().map(|t| t.dependencies.len()).sum();
    let with_parent = tasks.iter().filter(|t| t.parent_id.is_some()).count();
    let high_priority = tasks.iter().filter(|t| t.priority == Priority::High).count();

    let dependency_ratio = with_dependencies as f64 / n;
    let average_dependencies = dependency_total as f64 / n;
    let parent_ratio = with_parent as f64 / n;
    let high_ratio = high_priority as f64 / n;

    let recommendation = if dependency_ratio > 0.7 || average_dependencies > 2.0 {
        (
            Strategy::DependencyAware,
            format!(
                "Dense dependencies ({:.0}% of tasks have some, {:.1} on average)",
                dependency_ratio * 100.0,
                average_dependencies
            ),
        )
    } else if parent_ratio > 0.5 {
        (
            Strategy::DepthFirst,
            format!(
                "Deep hierarchy ({:.0}% of tasks are subtasks)",
                parent_ratio * 100.0
            ),
        )
    } else if high_ratio > 0.3 {
        (
            Strategy::Priority,
            format!(
                "Many urgent tasks ({:.0}% are high priority)",
                high_ratio * 100.0
            ),
        )
    } else {
        (
            Strategy::DependencyAware,
            "Balanced project: weigh dependencies, priority and hierarchy together".to_string(),
        )
    };
    Ok(recommendation)
}
