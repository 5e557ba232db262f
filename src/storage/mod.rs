//! # Storage Layer
//!
//! File-backed task snapshots and selector configuration.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `tasks.jsonl` or `--tasks` |
//! | Config | TOML, or JSON by extension | user config dir or `--config` |
//!
//! [`TaskStore`] uses file locking (`fs2`) for concurrent access and
//! rewrites atomically (temp file + rename).

mod config;
mod jsonl;

pub use config::{ConfigFormat, ConfigStore};
pub use jsonl::{TaskSource, TaskStore};
