//! JSONL storage for tasks
//!
//! Tasks are stored one JSON object per line, in the order the selector
//! should see them. Uses file locking for concurrent access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Task;

/// Anything that can hand the engine a full, ordered task snapshot
pub trait TaskSource {
    fn load_tasks(&self) -> Result<Vec<Task>>;
}

impl TaskSource for Vec<Task> {
    fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.clone())
    }
}

/// Store for task data in JSONL format
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all tasks in file order
    ///
    /// A later line with an id seen before replaces the earlier task in
    /// place, so appended updates win without reordering the snapshot.
    pub fn read_all(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        let reader = BufReader::new(&file);
        let mut tasks: Vec<Task> = Vec::new();
        let mut positions: HashMap<Uuid, usize> = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;

            match positions.get(&task.id) {
                Some(&at) => tasks[at] = task,
                None => {
                    positions.insert(task.id, tasks.len());
                    tasks.push(task);
                }
            }
        }

        debug!(path = %self.path.display(), tasks = tasks.len(), "loaded task store");
        Ok(tasks)
    }

    /// Writes all tasks to the store (full rewrite, order preserved)
    pub fn write_all(&self, tasks: &[Task]) -> Result<()> {
        self.ensure_parent()?;

        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on task store")?;

            let mut writer = BufWriter::new(&file);
            for task in tasks {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Appends a single task without rewriting the file
    pub fn append(&self, task: &Task) -> Result<()> {
        self.ensure_parent()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(task).context("Failed to serialize task")?;
        writeln!(writer, "{}", line).context("Failed to write task")?;
        writer.flush().context("Failed to flush task store")?;

        Ok(())
    }

    pub fn find(&self, id: &Uuid) -> Result<Option<Task>> {
        Ok(self.read_all()?.into_iter().find(|t| &t.id == id))
    }

    /// Replaces a stored task; returns false when the id is unknown
    pub fn update(&self, task: &Task) -> Result<bool> {
        let mut tasks = self.read_all()?;
        let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(false);
        };
        *slot = task.clone();
        self.write_all(&tasks)?;
        Ok(true)
    }

    fn ensure_parent(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display())),
            _ => Ok(()),
        }
    }
}

impl TaskSource for TaskStore {
    fn load_tasks(&self) -> Result<Vec<Task>> {
        self.read_all()
    }
}
