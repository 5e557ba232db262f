//! Dependency analysis: builder, cycle detector, metrics and validator
//! composed into one cacheable build step.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{DependencyGraph, SelectorConfig, Strategy, Task};

use super::actionability::ActionabilityValidator;
use super::builder::GraphBuilder;
use super::cache::{CacheKey, GraphCache};
use super::cycles::CycleDetector;
use super::metrics::MetricsCalculator;
use super::strategy::{self, TaskScore};

#[derive(Debug, Clone)]
pub struct DependencyAnalyzer {
    config: SelectorConfig,
    cache: Option<Arc<GraphCache>>,
}

impl DependencyAnalyzer {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Uses `cache` for graph lookups when caching is enabled in the config
    pub fn with_cache(config: SelectorConfig, cache: Arc<GraphCache>) -> Self {
        Self {
            config,
            cache: Some(cache),
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// The attached cache, whether or not caching is enabled
    pub fn cache(&self) -> Option<&Arc<GraphCache>> {
        self.cache.as_ref()
    }

    /// The attached cache, only when caching is enabled
    pub fn active_cache(&self) -> Option<&Arc<GraphCache>> {
        self.cache
            .as_ref()
            .filter(|_| self.config.advanced.cache_enabled)
    }

    pub fn cache_key(&self, tasks: &[Task]) -> CacheKey {
        CacheKey::new(tasks, &self.config)
    }

    /// Returns the graph for `tasks`, from the cache when possible
    pub fn build_dependency_graph(&self, tasks: &[Task]) -> Arc<DependencyGraph> {
        let key = self.active_cache().map(|_| self.cache_key(tasks));
        self.build_keyed(tasks, key.as_ref())
    }

    /// Like [`Self::build_dependency_graph`] with a key the caller already computed
    pub(crate) fn build_keyed(
        &self,
        tasks: &[Task],
        key: Option<&CacheKey>,
    ) -> Arc<DependencyGraph> {
        match self.active_cache().zip(key) {
            Some((cache, key)) => cache.get_or_insert_with(key, || self.build_uncached(tasks)),
            None => Arc::new(self.build_uncached(tasks)),
        }
    }

    /// Runs every analysis pass on a fresh graph
    pub fn build_uncached(&self, tasks: &[Task]) -> DependencyGraph {
        let started = Instant::now();

        let mut graph = GraphBuilder::new().build(tasks);
        CycleDetector::new().detect(&mut graph);
        MetricsCalculator::new(
            self.config.advanced.max_dependency_depth,
            self.config.behavior,
        )
        .calculate(&mut graph);
        ActionabilityValidator::new(self.config.behavior).apply(&mut graph);
        graph.built_at = Utc::now();

        debug!(
            tasks = graph.total_tasks,
            actionable = graph.actionable_count,
            has_cycles = graph.has_cycles,
            elapsed_us = started.elapsed().as_micros() as u64,
            "built dependency graph"
        );
        graph
    }

    /// Scores one task of `graph` under `strategy`
    pub fn score_task(
        &self,
        graph: &DependencyGraph,
        task_id: &Uuid,
        strategy: Strategy,
    ) -> Option<TaskScore> {
        let node = graph.node(task_id)?;
        let mut scored = TaskScore::from_node(node);
        scored.score = strategy::score(strategy, &scored, &self.config);
        scored.reason = strategy::explain(strategy, &scored);
        Some(scored)
    }
}
