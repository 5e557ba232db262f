//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{analysis, config_cmd, task};
use crate::domain::{Preset, SelectorConfig, Strategy};
use crate::engine::SelectionError;
use crate::storage::{ConfigStore, TaskStore};

#[derive(Parser)]
#[command(name = "taskpick")]
#[command(author, version, about = "Pick the next task to work on from a dependency graph")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Task snapshot in JSONL format
    #[arg(
        long,
        short = 't',
        global = true,
        env = "TASKPICK_TASKS",
        default_value = "tasks.jsonl"
    )]
    pub tasks: PathBuf,

    /// Configuration file (TOML, or JSON by extension)
    #[arg(long, short = 'c', global = true, env = "TASKPICK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a built-in preset instead of a configuration file
    #[arg(long, global = true)]
    pub preset: Option<Preset>,

    /// Override the configured strategy
    #[arg(long, short = 's', global = true)]
    pub strategy: Option<Strategy>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select the next task to work on
    Next {
        /// Number of runner-up tasks to show
        #[arg(long, short = 'n', default_value = "3")]
        alternatives: usize,
    },

    /// Score and rank every task
    Score {
        /// Show only the first N tasks
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report circular and missing dependencies
    Validate,

    /// Suggest a strategy for this task set
    Recommend,

    /// Mark a task as completed
    Done {
        /// Task id, or an unambiguous prefix of it
        id: String,
    },

    /// Inspect and write configuration
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Task store and effective configuration shared by every command
pub struct Session {
    pub store: TaskStore,
    pub config: SelectorConfig,
}

impl Session {
    /// Resolves the effective configuration
    ///
    /// Precedence: `--preset`, then `--config`, then the default location,
    /// then built-in defaults. `--strategy` overrides whichever applies.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match (&cli.preset, &cli.config) {
            (Some(preset), _) => preset.config(),
            (None, Some(path)) => ConfigStore::new(path).load()?,
            (None, None) => match ConfigStore::default_path() {
                Some(path) => ConfigStore::new(path).load_or_default()?,
                None => SelectorConfig::default(),
            },
        };
        if let Some(strategy) = cli.strategy {
            config.strategy = strategy;
        }

        debug!(
            tasks = %cli.tasks.display(),
            strategy = %config.strategy,
            "resolved session"
        );
        Ok(Self {
            store: TaskStore::new(&cli.tasks),
            config,
        })
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "taskpick=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
///
/// Failures are reported through [`Output`] before being returned, so the
/// caller only needs to map the result to an exit code.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format);

    let result = dispatch(cli, &output);
    if let Err(e) = &result {
        match e.downcast_ref::<SelectionError>() {
            Some(err) => output.selection_error(err),
            None => output.error(&format!("{:#}", e)),
        }
    }
    result
}

fn dispatch(cli: Cli, output: &Output) -> Result<()> {
    let session = Session::from_cli(&cli)?;
    match cli.command {
        Commands::Next { alternatives } => analysis::next(&session, output, alternatives),
        Commands::Score { limit } => analysis::score(&session, output, limit),
        Commands::Validate => analysis::validate(&session, output),
        Commands::Recommend => analysis::recommend(&session, output),
        Commands::Done { id } => task::done(&session, output, &id),
        Commands::Config(cmd) => config_cmd::run(cmd, &session, output),
    }
}
