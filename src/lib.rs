//! taskpick - dependency-aware next-task selection
//!
//! Builds a dependency graph over a task snapshot, detects cycles, derives
//! per-task metrics, decides which tasks are actionable and picks the best
//! one under a configurable strategy.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod storage;

pub use domain::{Priority, SelectorConfig, Strategy, Task, TaskStatus};
pub use engine::{SelectionError, SelectionResult, TaskSelector};
