//! Agent core: action protocol, executor, context and the agent loop
//!
//! The loop prompts a language model, parses its reply into actions, runs
//! them against the workspace and feeds shell output back until the model
//! answers DONE.

use thiserror::Error;

pub mod context;
pub mod executor;
pub mod loop_agent;
pub mod protocol;
pub mod task;

pub use context::{Context, DEFAULT_PREAMBLE};
pub use executor::{ExecutionResult, Executor, HostShell, ShellOutcome, ShellRunner};
pub use loop_agent::{AgentLoop, AgentSettings, LoopState, TaskReport};
pub use protocol::{contains_done, parse, parse_with, Action, ActionKind, ActionOrder};
pub use task::{GeneratedFileSet, Task, TaskStatus, Transcript};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
