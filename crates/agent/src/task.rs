//! Task-scoped state: context, generated files and transcript

use autocoder_bus::SurfaceBus;
use uuid::Uuid;

use crate::context::Context;
use crate::executor::{ExecutionResult, Executor};

/// Append-only log of human-readable lines
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Latest content of every file written during a task, in first-write order
#[derive(Debug, Clone, Default)]
pub struct GeneratedFileSet {
    entries: Vec<(String, String)>,
}

impl GeneratedFileSet {
    pub fn upsert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((path, content)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The model emitted DONE
    Completed,
    IterationLimit,
    TimeLimit,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::IterationLimit => "iteration_limit",
            TaskStatus::TimeLimit => "time_limit",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one user task. Every transcript line and file upsert is also
/// published to the surface.
#[derive(Debug)]
pub struct Task {
    pub id: Uuid,
    context: Context,
    files: GeneratedFileSet,
    transcript: Transcript,
    surface: SurfaceBus,
}

impl Task {
    pub fn new(context: Context, surface: SurfaceBus) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            files: GeneratedFileSet::default(),
            transcript: Transcript::default(),
            surface,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn files(&self) -> &GeneratedFileSet {
        &self.files
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn surface(&self) -> &SurfaceBus {
        &self.surface
    }

    /// Append a transcript line and publish it
    pub fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.surface.line(line.clone());
        self.transcript.push(line);
    }

    /// Upsert a generated file and publish it
    pub fn record_file(&mut self, path: &str, content: &str) {
        self.files.upsert(path, content);
        self.surface.file_upsert(path, content);
    }

    /// Save a user edit through the executor. The file set only changes when
    /// the write succeeds.
    pub async fn save_edit(
        &mut self,
        executor: &Executor,
        path: &str,
        content: &str,
    ) -> ExecutionResult {
        let result = executor.write_file(path, content).await;
        if matches!(result, ExecutionResult::Written { .. }) {
            self.record_file(path, content);
        }
        self.record(result.transcript_line());
        result
    }
}
