//! Action executor
//!
//! Performs the side effect of one parsed action against the task workspace
//! and reports it as an [`ExecutionResult`]. Failures never escape as errors:
//! they become results the loop writes to the transcript.

pub mod filesystem;
pub mod path_utils;
pub mod shell;

pub use path_utils::{check_filename, resolve_in_workspace, PathRejection, MAX_FILENAME_LEN};
pub use shell::{HostShell, ShellOutcome, ShellRunner};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use autocoder_config::Config;
use tracing::{debug, warn};

use crate::protocol::Action;

/// Outcome of executing one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Written {
        path: String,
        bytes: usize,
    },
    Rejected {
        path: String,
        reason: String,
    },
    WriteFailed {
        path: String,
        error: String,
    },
    Shell {
        output: String,
        exit_code: Option<i32>,
        timed_out: bool,
    },
    Informational(String),
}

impl ExecutionResult {
    /// Human-readable line for the transcript
    pub fn transcript_line(&self) -> String {
        match self {
            ExecutionResult::Written { path, .. } => format!("[+] File written: {}", path),
            ExecutionResult::Rejected { path, reason } => {
                format!("[!] Rejected file name {:?}: {}", path, reason)
            }
            ExecutionResult::WriteFailed { path, error } => {
                format!("[!] Failed to write {}: {}", path, error)
            }
            ExecutionResult::Shell { output, .. } if output.trim().is_empty() => {
                "(no output)".to_string()
            }
            ExecutionResult::Shell { output, .. } => output.clone(),
            ExecutionResult::Informational(text) => format!("[AI MESSAGE] {}", text),
        }
    }

    /// Output to feed back into the model context, shell results only
    pub fn shell_output(&self) -> Option<&str> {
        match self {
            ExecutionResult::Shell { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Executes actions inside one workspace directory
#[derive(Clone)]
pub struct Executor {
    workspace: PathBuf,
    shell: Arc<dyn ShellRunner>,
}

impl Executor {
    /// Executor with the default host shell
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self::with_shell(workspace, Arc::new(HostShell::default()))
    }

    pub fn with_shell(workspace: impl Into<PathBuf>, shell: Arc<dyn ShellRunner>) -> Self {
        Self {
            workspace: workspace.into(),
            shell,
        }
    }

    /// Workspace and shell limits from configuration
    pub fn from_config(config: &Config) -> Self {
        let shell = HostShell::from_limits(
            config.agent.shell_timeout_secs,
            config.agent.max_output_chars,
        );
        Self::with_shell(config.workspace_path(), Arc::new(shell))
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub async fn execute(&self, action: &Action) -> ExecutionResult {
        match action {
            Action::WriteFile { path, content } => self.write_file(path, content).await,
            Action::RunShell { command } => self.run_shell(command).await,
            Action::Emit { message } => self.emit_message(message),
        }
    }

    /// Write full content at a relative path under the workspace
    pub async fn write_file(&self, path: &str, content: &str) -> ExecutionResult {
        if let Err(reason) = check_filename(path) {
            warn!("◆ rejected file name {:?}: {}", path, reason);
            return ExecutionResult::Rejected {
                path: path.to_string(),
                reason: reason.to_string(),
            };
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.workspace).await {
            return ExecutionResult::WriteFailed {
                path: path.to_string(),
                error: e.to_string(),
            };
        }

        let target = match resolve_in_workspace(path, &self.workspace).await {
            Ok(target) => target,
            Err(reason) => {
                warn!("◆ rejected file name {:?}: {}", path, reason);
                return ExecutionResult::Rejected {
                    path: path.to_string(),
                    reason: reason.to_string(),
                };
            }
        };

        debug!("◆ writing {} bytes to {:?}", content.len(), target);
        match filesystem::write_atomic(&target, content).await {
            Ok(()) => ExecutionResult::Written {
                path: path.to_string(),
                bytes: content.len(),
            },
            Err(e) => {
                warn!("◆ write failed for {}: {}", path, e);
                ExecutionResult::WriteFailed {
                    path: path.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run a command with the workspace as working directory
    pub async fn run_shell(&self, command: &str) -> ExecutionResult {
        if let Err(e) = tokio::fs::create_dir_all(&self.workspace).await {
            return ExecutionResult::Shell {
                output: format!("failed to prepare workspace: {}", e),
                exit_code: None,
                timed_out: false,
            };
        }

        let outcome = self.shell.run(command, &self.workspace).await;
        if !outcome.success() {
            warn!(
                "◆ shell command exited with {:?}{}: {}",
                outcome.exit_code,
                if outcome.timed_out { " (timed out)" } else { "" },
                command
            );
        }

        ExecutionResult::Shell {
            output: outcome.output,
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
        }
    }

    pub fn emit_message(&self, text: &str) -> ExecutionResult {
        ExecutionResult::Informational(text.to_string())
    }
}
