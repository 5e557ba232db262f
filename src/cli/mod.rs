//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `next` | Select the next task, with runner-ups and the reason |
//! | `score` | Rank every task under the active strategy |
//! | `validate` | Report circular and missing dependencies |
//! | `recommend` | Suggest a strategy for the task set |
//! | `done <id>` | Mark a task completed |
//! | `config show\|presets\|init` | Inspect and write configuration |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! `--verbose` (or `-v`) enables debug logs on stderr; `RUST_LOG`
//! overrides the filter entirely:
//! ```bash
//! RUST_LOG=taskpick=trace taskpick next
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod analysis;
mod app;
mod config_cmd;
mod output;
mod task;

pub use app::{run, Cli, Commands, Session};
pub use output::{Output, OutputFormat};
