//! Selection and analysis commands (next, score, validate, recommend)

use anyhow::Result;

use super::app::Session;
use super::output::Output;
use crate::engine::{self, SelectionError, TaskSelector};
use crate::storage::TaskSource;

/// Select the next task to work on
pub fn next(session: &Session, output: &Output, alternatives: usize) -> Result<()> {
    let tasks = session.store.load_tasks()?;
    let selector = TaskSelector::new(session.config.clone())?;
    let mut result = selector.select(&tasks)?;
    result.alternatives.truncate(alternatives);

    if output.is_json() {
        output.data(&result);
        return Ok(());
    }

    let task = &result.task;
    println!("Next task: {}", task.label());
    println!("  id:       {}", task.id);
    println!("  status:   {}", task.status);
    println!("  priority: {}", task.priority);
    println!(
        "  score:    {:.2} ({})",
        result.score.score,
        result.strategy.display_name()
    );
    println!("  reason:   {}", result.reason);

    if !result.alternatives.is_empty() {
        println!();
        println!("Alternatives:");
        for (rank, alt) in result.alternatives.iter().enumerate() {
            println!(
                "  {}. {:<30} {:>10.2}  {}",
                rank + 1,
                alt.task.label(),
                alt.score,
                alt.task.id
            );
        }
    }

    Ok(())
}

/// Score and rank every task
pub fn score(session: &Session, output: &Output, limit: Option<usize>) -> Result<()> {
    let tasks = session.store.load_tasks()?;
    let mut scores = engine::score_tasks(&tasks, session.config.strategy, &session.config)?;
    if let Some(limit) = limit {
        scores.truncate(limit);
    }

    if output.is_json() {
        output.data(&scores);
        return Ok(());
    }

    println!(
        "Scores ({} strategy, {} tasks):",
        session.config.strategy.display_name(),
        scores.len()
    );
    println!("{:<5} {:>10}  {:<12} {:<36} TITLE", "RANK", "SCORE", "STATUS", "ID");
    println!("{}", "-".repeat(100));
    for (rank, scored) in scores.iter().enumerate() {
        println!(
            "{:<5} {:>10.2}  {:<12} {:<36} {}",
            rank + 1,
            scored.score,
            scored.task.status,
            scored.task.id,
            scored.task.label()
        );
    }

    Ok(())
}

/// Report circular and missing dependencies; fails when any are found
pub fn validate(session: &Session, output: &Output) -> Result<()> {
    let tasks = session.store.load_tasks()?;
    let findings = engine::validate_task_dependencies(&tasks)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "tasks": tasks.len(),
            "valid": findings.is_empty(),
            "findings": findings,
        }));
    } else if findings.is_empty() {
        println!("No dependency problems in {} tasks.", tasks.len());
    } else {
        println!("Dependency problems ({}):", findings.len());
        for finding in &findings {
            println!("  - {}", finding);
        }
    }

    if findings.is_empty() {
        Ok(())
    } else {
        Err(SelectionError::Validation(format!(
            "{} dependency problem(s) found",
            findings.len()
        ))
        .into())
    }
}

/// Suggest a strategy for the current task set
pub fn recommend(session: &Session, output: &Output) -> Result<()> {
    let tasks = session.store.load_tasks()?;
    let (strategy, reason) = engine::recommend_strategy(&tasks)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "strategy": strategy,
            "reason": reason,
            "current": session.config.strategy,
        }));
        return Ok(());
    }

    println!("Recommended strategy: {}", strategy.display_name());
    println!("  {}", strategy.description());
    println!("  Why: {}", reason);
    if strategy != session.config.strategy {
        println!(
            "  Currently using {}; try `--strategy {}`",
            session.config.strategy.display_name(),
            strategy.display_name()
        );
    }

    Ok(())
}
