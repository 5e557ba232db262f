//! Configuration commands

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;

use super::app::Session;
use super::output::Output;
use crate::domain::Preset;
use crate::storage::{ConfigFormat, ConfigStore};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// List the built-in presets
    Presets,

    /// Write the effective configuration to a file
    Init {
        /// Target file (defaults to the user config location)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cmd: ConfigCommands, session: &Session, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(session, output),
        ConfigCommands::Presets => presets(output),
        ConfigCommands::Init { path, force } => init(session, output, path, force),
    }
}

fn show(session: &Session, output: &Output) -> Result<()> {
    if output.is_json() {
        output.data(&session.config);
    } else {
        print!("{}", ConfigFormat::Toml.render(&session.config)?);
    }
    Ok(())
}

fn presets(output: &Output) -> Result<()> {
    if output.is_json() {
        let items: Vec<_> = Preset::ALL
            .iter()
            .map(|preset| {
                serde_json::json!({
                    "name": preset.as_str(),
                    "description": preset.description(),
                    "strategy": preset.config().strategy,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    println!("{:<20} {:<18} DESCRIPTION", "PRESET", "STRATEGY");
    println!("{}", "-".repeat(80));
    for preset in Preset::ALL {
        println!(
            "{:<20} {:<18} {}",
            preset.as_str(),
            preset.config().strategy.display_name(),
            preset.description()
        );
    }
    Ok(())
}

fn init(session: &Session, output: &Output, path: Option<PathBuf>, force: bool) -> Result<()> {
    let store = match path {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::user_default()?,
    };

    if store.exists() && !force {
        bail!(
            "Config already exists: {} (use --force to overwrite)",
            store.path().display()
        );
    }

    session.config.validate()?;
    store.save(&session.config)?;
    output.success(&format!("Wrote config to {}", store.path().display()));
    Ok(())
}
