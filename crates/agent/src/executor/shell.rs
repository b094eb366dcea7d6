//! Shell command execution

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutcome {
    /// stdout followed by stderr
    pub output: String,
    /// `None` when the process was killed or never started
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ShellOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run a shell command inside a directory.
///
/// The host implementation performs no validation; swap in another runner to
/// sandbox or restrict commands.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path) -> ShellOutcome;
}

/// Runs commands with `sh -c` on the host
#[derive(Debug, Clone)]
pub struct HostShell {
    timeout: Option<Duration>,
    max_output_chars: usize,
}

impl HostShell {
    pub fn new(timeout: Option<Duration>, max_output_chars: usize) -> Self {
        Self {
            timeout,
            max_output_chars,
        }
    }

    /// Build from config values where 0 disables the limit
    pub fn from_limits(timeout_secs: u64, max_output_chars: usize) -> Self {
        Self::new(
            (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_output_chars,
        )
    }
}

impl Default for HostShell {
    fn default() -> Self {
        Self::from_limits(120, 16_000)
    }
}

#[async_trait]
impl ShellRunner for HostShell {
    async fn run(&self, command: &str, working_dir: &Path) -> ShellOutcome {
        debug!("◆ executing: {}", command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return ShellOutcome {
                    output: format!("failed to start shell: {}", e),
                    exit_code: None,
                    timed_out: false,
                }
            }
        };

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // dropping the future kills the child
                    return ShellOutcome {
                        output: format!("command timed out after {} seconds", limit.as_secs()),
                        exit_code: None,
                        timed_out: true,
                    };
                }
            },
            None => child.wait_with_output().await,
        };

        match waited {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                ShellOutcome {
                    output: truncate_output(text, self.max_output_chars),
                    exit_code: output.status.code(),
                    timed_out: false,
                }
            }
            Err(e) => ShellOutcome {
                output: format!("failed to collect shell output: {}", e),
                exit_code: None,
                timed_out: false,
            },
        }
    }
}

/// Keep the first `max_chars` characters, 0 keeps everything
pub fn truncate_output(text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let dropped = text[cut..].chars().count();
            format!("{}\n... output truncated ({} characters omitted)", &text[..cut], dropped)
        }
        None => text,
    }
}
