//! Task state commands

use anyhow::{bail, Result};
use tracing::info;

use super::app::Session;
use super::output::Output;
use crate::domain::{Task, TaskStatus};

/// Mark a task as completed
pub fn done(session: &Session, output: &Output, id: &str) -> Result<()> {
    let tasks = session.store.read_all()?;
    let mut task = resolve(&tasks, id)?.clone();

    if task.status == TaskStatus::Completed {
        output.success(&format!("Task already completed: {}", task.label()));
        return Ok(());
    }

    task.complete();
    session.store.update(&task)?;
    info!(task = %task.id, "marked task completed");

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "task": task,
        }));
    } else {
        output.success(&format!("Completed {} ({})", task.label(), task.id));
    }
    Ok(())
}

/// Finds a task by full id or unambiguous id prefix
fn resolve<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    let needle = id.trim().to_ascii_lowercase();
    if needle.is_empty() {
        bail!("Task id must not be empty");
    }

    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [task] => Ok(task),
        [] => bail!("Task not found: {}", id),
        many => bail!(
            "Task id '{}' is ambiguous ({} matches); use more characters",
            id,
            many.len()
        ),
    }
}
