//! Output formatting for CLI commands

use serde::Serialize;

use crate::engine::SelectionError;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints an engine failure with its kind, implicated tasks and suggestions
    pub fn selection_error(&self, err: &SelectionError) {
        match self.format {
            OutputFormat::Text => {
                eprintln!("Error [{}]: {}", err.kind(), err);
                if let Some(context) = err.context().filter(|c| !c.is_empty()) {
                    for (id, title) in context.task_ids.iter().zip(&context.task_titles) {
                        eprintln!("  - {} ({})", title, id);
                    }
                    if !context.suggestions.is_empty() {
                        eprintln!("Suggestions:");
                        for suggestion in &context.suggestions {
                            eprintln!("  * {}", suggestion);
                        }
                    }
                }
            }
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "kind": err.kind(),
                        "error": err.to_string(),
                        "context": err.context(),
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
