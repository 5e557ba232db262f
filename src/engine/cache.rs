//! In-memory cache of built dependency graphs
//!
//! Entries are keyed by a digest of the task snapshot, the strategy and the
//! configuration, and expire after a TTL. A single read/write lock guards
//! the graph map (and another the score map): lookups share the lock,
//! inserts and invalidation take it exclusively. Every insert also sweeps
//! out expired entries, so the maps only hold live snapshots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{DependencyGraph, SelectorConfig, Strategy, Task};

use super::strategy::TaskScore;

/// Cache key for one (snapshot, strategy, configuration) combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// Project shared by every task in the snapshot, if any
    pub project_id: Option<String>,
    pub content_hash: String,
    pub strategy: Strategy,
    pub config_hash: String,
}

impl CacheKey {
    pub fn new(tasks: &[Task], config: &SelectorConfig) -> Self {
        Self {
            project_id: common_project(tasks),
            content_hash: content_digest(tasks),
            strategy: config.strategy,
            config_hash: config.digest(),
        }
    }
}

fn common_project(tasks: &[Task]) -> Option<String> {
    let first = tasks.first()?.project_id.as_ref()?;
    tasks
        .iter()
        .all(|t| t.project_id.as_ref() == Some(first))
        .then(|| first.clone())
}

/// Digest over the serialized form of every task, in input order
///
/// Cached graphs and scores hold clones of the tasks, so any field change
/// (titles included) has to produce a new key.
pub fn content_digest(tasks: &[Task]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(tasks.len() as u64).to_le_bytes());
    for task in tasks {
        if serde_json::to_writer(&mut hasher, task).is_err() {
            hasher.update(task.id.as_bytes());
        }
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// A cached graph and its lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub graph: Arc<DependencyGraph>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
struct ScoreEntry {
    score: TaskScore,
    expires_at: DateTime<Utc>,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub scores: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe graph cache with TTL expiry
#[derive(Debug)]
pub struct GraphCache {
    ttl: std::time::Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    scores: RwLock<HashMap<(CacheKey, Uuid), ScoreEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GraphCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            scores: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Expiry for an entry computed at `from`; saturates instead of overflowing
    fn expiry(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| from.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Lifetime given to every entry; fixed when the cache is created
    pub fn ttl(&self) -> std::time::Duration {
        self.ttl
    }

    pub fn from_config(config: &SelectorConfig) -> Self {
        Self::new(std::time::Duration::from_secs(
            config.advanced.cache_duration_secs,
        ))
    }

    /// Returns the cached graph if present and unexpired
    pub fn get(&self, key: &CacheKey) -> Option<Arc<DependencyGraph>> {
        let now = Utc::now();
        let found = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(key).map(|entry| (entry.is_expired(now), entry.graph.clone()))
        };

        match found {
            Some((false, graph)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(content_hash = %key.content_hash, "graph cache hit");
                Some(graph)
            }
            Some((true, _)) => {
                let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
                if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
                    entries.remove(key);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(content_hash = %key.content_hash, "graph cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, graph: Arc<DependencyGraph>) {
        let computed_at = Utc::now();
        let entry = CacheEntry {
            graph,
            computed_at,
            expires_at: self.expiry(computed_at),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, existing| !existing.is_expired(computed_at));
        entries.insert(key, entry);
    }

    /// Returns the cached graph or builds, stores and returns a new one
    pub fn get_or_insert_with<F>(&self, key: &CacheKey, build: F) -> Arc<DependencyGraph>
    where
        F: FnOnce() -> DependencyGraph,
    {
        if let Some(graph) = self.get(key) {
            return graph;
        }
        let graph = Arc::new(build());
        self.insert(key.clone(), graph.clone());
        graph
    }

    pub fn get_score(&self, key: &CacheKey, task_id: &Uuid) -> Option<TaskScore> {
        let now = Utc::now();
        let scores = self.scores.read().unwrap_or_else(PoisonError::into_inner);
        scores
            .get(&(key.clone(), *task_id))
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.score.clone())
    }

    pub fn insert_score(&self, key: &CacheKey, score: TaskScore) {
        let now = Utc::now();
        let expires_at = self.expiry(now);
        let mut scores = self.scores.write().unwrap_or_else(PoisonError::into_inner);
        scores.retain(|_, existing| now < existing.expires_at);
        scores.insert((key.clone(), score.task.id), ScoreEntry { score, expires_at });
    }

    /// Drops every entry built from a snapshot of the given project
    pub fn invalidate_project(&self, project_id: &str) -> usize {
        let matches = |key: &CacheKey| key.project_id.as_deref() == Some(project_id);

        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let before = entries.len();
            entries.retain(|key, _| !matches(key));
            before - entries.len()
        };
        {
            let mut scores = self.scores.write().unwrap_or_else(PoisonError::into_inner);
            scores.retain(|(key, _), _| !matches(key));
        }

        debug!(project_id, removed, "invalidated project cache entries");
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.scores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Removes expired entries; returns how many graphs were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            before - entries.len()
        };
        self.scores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| now < entry.expires_at);
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            scores: self
                .scores
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyNode, TaskStatus};
    use std::thread;

    fn key_for(tasks: &[Task]) -> CacheKey {
        CacheKey::new(tasks, &SelectorConfig::default())
    }

    #[test]
    fn miss_then_hit() {
        let cache = GraphCache::new(std::time::Duration::from_secs(60));
        let tasks = vec![Task::new("A")];
        let key = key_for(&tasks);

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), Arc::new(DependencyGraph::new()));
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = GraphCache::new(std::time::Duration::ZERO);
        let key = key_for(&[Task::new("A")]);

        cache.insert(key.clone(), Arc::new(DependencyGraph::new()));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn purge_drops_only_expired() {
        let expired = GraphCache::new(std::time::Duration::ZERO);
        let tasks = vec![Task::new("A")];
        let key = key_for(&tasks);
        expired.insert(key.clone(), Arc::new(DependencyGraph::new()));
        assert_eq!(expired.purge_expired(), 1);

        let live = GraphCache::new(std::time::Duration::from_secs(60));
        live.insert(key, Arc::new(DependencyGraph::new()));
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.stats().entries, 1);
    }

    #[test]
    fn digest_sees_changes_in_the_middle() {
        let mut tasks: Vec<Task> = (0..5).map(|i| Task::new(format!("T{}", i))).collect();
        let before = content_digest(&tasks);

        tasks[2].status = TaskStatus::Completed;
        assert_ne!(before, content_digest(&tasks));
    }

    #[test]
    fn digest_sees_title_changes() {
        let mut tasks = vec![Task::new("Old title")];
        let before = content_digest(&tasks);

        tasks[0].title = "New title".to_string();
        assert_ne!(before, content_digest(&tasks));
    }

    #[test]
    fn insert_sweeps_stale_entries_under_other_keys() {
        let cache = GraphCache::new(std::time::Duration::ZERO);
        let first = vec![Task::new("A")];
        let second = vec![Task::new("B")];

        cache.insert(key_for(&first), Arc::new(DependencyGraph::new()));
        cache.insert(key_for(&second), Arc::new(DependencyGraph::new()));
        assert_eq!(cache.stats().entries, 1);

        for tasks in [&first, &second] {
            let score = TaskScore::from_node(&DependencyNode::new(tasks[0].clone()));
            cache.insert_score(&key_for(tasks), score);
        }
        assert_eq!(cache.stats().scores, 1);
    }

    #[test]
    fn key_includes_strategy_and_config() {
        let tasks = vec![Task::new("A")];
        let default = CacheKey::new(&tasks, &SelectorConfig::default());
        let priority = CacheKey::new(
            &tasks,
            &SelectorConfig::default().with_strategy(Strategy::Priority),
        );
        assert_ne!(default, priority);
        assert_eq!(default.content_hash, priority.content_hash);
    }

    #[test]
    fn invalidate_by_project() {
        let cache = GraphCache::new(std::time::Duration::from_secs(60));
        let alpha = vec![Task::new("A").with_project("alpha")];
        let beta = vec![Task::new("B").with_project("beta")];

        cache.insert(key_for(&alpha), Arc::new(DependencyGraph::new()));
        cache.insert(key_for(&beta), Arc::new(DependencyGraph::new()));

        assert_eq!(cache.invalidate_project("alpha"), 1);
        assert!(cache.get(&key_for(&alpha)).is_none());
        assert!(cache.get(&key_for(&beta)).is_some());

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn mixed_projects_have_no_common_project() {
        let tasks = vec![
            Task::new("A").with_project("alpha"),
            Task::new("B").with_project("beta"),
        ];
        assert_eq!(key_for(&tasks).project_id, None);
    }

    #[test]
    fn get_or_insert_builds_once() {
        let cache = GraphCache::new(std::time::Duration::from_secs(60));
        let key = key_for(&[Task::new("A")]);
        let mut builds = 0;

        cache.get_or_insert_with(&key, || {
            builds += 1;
            DependencyGraph::new()
        });
        cache.get_or_insert_with(&key, || {
            builds += 1;
            DependencyGraph::new()
        });
        assert_eq!(builds, 1);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(GraphCache::new(std::time::Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let tasks = vec![Task::new(format!("T{}", i))];
                    let key = key_for(&tasks);
                    for _ in 0..50 {
                        cache.get_or_insert_with(&key, DependencyGraph::new);
                        cache.stats();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.stats().entries, 8);
    }
}
