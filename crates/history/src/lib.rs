//! Saved task history
//!
//! Every finished run is kept as one JSON record named after its task id, so
//! past tasks can be listed, shown again and removed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use autocoder_agent::TaskReport;
use autocoder_config::ensure_dir;

/// Length of the task text shown in listings
pub const SUMMARY_CHARS: usize = 60;

/// A file written by the task, with the size of its final content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub bytes: usize,
}

/// Everything kept about one finished task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    /// The task as the user gave it
    pub task: String,
    pub status: String,
    pub iterations: u32,
    #[serde(default)]
    pub workspace: String,
    /// Transcript lines in the order they were produced
    pub transcript: Vec<String>,
    /// Files in first-write order
    #[serde(default)]
    pub files: Vec<FileEntry>,
    pub finished_at: DateTime<Local>,
}

impl TaskRecord {
    pub fn from_report(report: &TaskReport, workspace: &Path) -> Self {
        let task = &report.task;
        Self {
            id: task.id.to_string(),
            task: task.context().task().to_string(),
            status: report.status.as_str().to_string(),
            iterations: report.iterations,
            workspace: workspace.to_string_lossy().into_owned(),
            transcript: task.transcript().lines().to_vec(),
            files: task
                .files()
                .iter()
                .map(|(path, content)| FileEntry {
                    path: path.to_string(),
                    bytes: content.len(),
                })
                .collect(),
            finished_at: Local::now(),
        }
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            task: headline(&self.task),
            status: self.status.clone(),
            iterations: self.iterations,
            files: self.files.len(),
            finished_at: self.finished_at,
        }
    }
}

/// One line of `history list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: String,
    pub task: String,
    pub status: String,
    pub iterations: u32,
    pub files: usize,
    pub finished_at: DateTime<Local>,
}

/// First line of the task, cut to `SUMMARY_CHARS`
fn headline(task: &str) -> String {
    let first = task.lines().next().unwrap_or_default().trim();
    if first.chars().count() > SUMMARY_CHARS {
        let cut: String = first.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

/// Task ids are uuids; anything else never maps to a file
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Stores task records as JSON files in one directory
pub struct TaskStore {
    tasks_dir: PathBuf,
}

impl TaskStore {
    pub fn new(tasks_dir: impl AsRef<Path>) -> Self {
        Self {
            tasks_dir: tasks_dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// Write a record, replacing any earlier one with the same id
    pub async fn save(&self, record: &TaskRecord) -> std::io::Result<PathBuf> {
        ensure_dir(&self.tasks_dir).await?;
        let path = self.tasks_dir.join(format!("{}.json", record.id));
        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, content).await?;
        debug!("◆ saved task {}", record.id);
        Ok(path)
    }

    /// Load a record by full id or by a prefix that matches exactly one record
    pub async fn load(&self, id: &str) -> Option<TaskRecord> {
        let id = self.resolve(id).await?;
        let path = self.record_path(&id)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<TaskRecord>(&content) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("◆ failed to parse task {}: {}", id, e);
                    None
                }
            },
            Err(e) => {
                warn!("◆ failed to read task {}: {}", id, e);
                None
            }
        }
    }

    /// Delete a record; `Ok(false)` when nothing matched
    pub async fn delete(&self, id: &str) -> std::io::Result<bool> {
        let Some(path) = self
            .resolve(id)
            .await
            .and_then(|id| self.record_path(&id))
        else {
            return Ok(false);
        };
        tokio::fs::remove_file(path).await?;
        Ok(true)
    }

    /// Summaries of all readable records, newest first
    pub async fn list(&self) -> Vec<TaskSummary> {
        let mut summaries = Vec::new();

        for id in self.ids().await {
            match self.load(&id).await {
                Some(record) => summaries.push(record.summary()),
                None => debug!("◆ skipping unreadable task {}", id),
            }
        }

        summaries.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        summaries
    }

    async fn ids(&self) -> Vec<String> {
        let mut ids = Vec::new();

        if let Ok(mut entries) = tokio::fs::read_dir(&self.tasks_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stripped) = name.strip_suffix(".json") {
                        if is_valid_id(stripped) {
                            ids.push(stripped.to_string());
                        }
                    }
                }
            }
        }

        ids
    }

    async fn resolve(&self, id: &str) -> Option<String> {
        if !is_valid_id(id) {
            return None;
        }
        if self.record_path(id).is_some_and(|path| path.exists()) {
            return Some(id.to_string());
        }

        let mut matches = self
            .ids()
            .await
            .into_iter()
            .filter(|candidate| candidate.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            (Some(_), Some(_)) => {
                warn!("◆ task id prefix {} is ambiguous", id);
                None
            }
            _ => None,
        }
    }

    fn record_path(&self, id: &str) -> Option<PathBuf> {
        is_valid_id(id).then(|| self.tasks_dir.join(format!("{}.json", id)))
    }
}
