//! Dependency analysis and next-task selection
//!
//! The pipeline runs in a fixed order: [`GraphBuilder`] indexes tasks and
//! links dependencies, [`CycleDetector`] marks cycle members,
//! [`MetricsCalculator`] derives depths and unblock counts, and
//! [`ActionabilityValidator`] decides what can be started. [`TaskSelector`]
//! then filters, scores and ranks the actionable tasks.

mod actionability;
mod analyzer;
mod builder;
mod cache;
mod cycles;
mod error;
mod filter;
mod metrics;
mod selector;
mod strategy;

pub use actionability::{Actionability, ActionabilityValidator, ACTIVE_SUBTASKS_REASON};
pub use analyzer::DependencyAnalyzer;
pub use builder::{missing_dependency_reason, GraphBuilder};
pub use cache::{content_digest, CacheEntry, CacheKey, CacheStats, GraphCache};
pub use cycles::CycleDetector;
pub use error::{ErrorContext, ErrorKind, Result, SelectionError, ValidationError, ValidationKind};
pub use filter::TaskFilter;
pub use metrics::{hierarchy_depth, MetricsCalculator};
pub use selector::{
    recommend_strategy, score_tasks, validate_task_dependencies, SelectionResult, TaskSelector,
};
pub use strategy::{explain, resolve_strategy, score, TaskScore, IN_PROGRESS_BOOST};
