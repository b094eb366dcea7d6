//! Agent loop - generate, parse, execute, repeat

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use autocoder_bus::SurfaceBus;
use autocoder_config::Config;
use autocoder_provider::{Decoding, GenerateOptions, GenerateParams, Provider};

use crate::context::{Context, DEFAULT_PREAMBLE};
use crate::executor::{ExecutionResult, Executor};
use crate::protocol::{self, Action, ActionOrder};
use crate::task::{Task, TaskStatus};
use crate::{AgentError, Result};

pub const COMPLETION_MARKER: &str = "[✓] Task Complete";
pub const RESPONSE_HEADER: &str = "=== MODEL RESPONSE ===";
pub const STOPPED_MARKER: &str = "[!] Stopped by user";

/// Knobs for one agent loop
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// 0 disables the cap
    pub max_iterations: u32,
    pub max_runtime: Option<Duration>,
    /// 0 sends the full context
    pub max_context_chars: usize,
    pub action_order: ActionOrder,
    pub preamble: String,
    pub generation: GenerateOptions,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        let agent = &config.agent;
        let generation = &config.generation;

        Self {
            max_iterations: agent.max_iterations,
            max_runtime: (agent.max_runtime_secs > 0)
                .then(|| Duration::from_secs(agent.max_runtime_secs)),
            max_context_chars: agent.max_context_chars,
            action_order: agent.action_order.into(),
            preamble: agent
                .preamble
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PREAMBLE.to_string()),
            generation: GenerateOptions {
                model: config.model_name(),
                temperature: generation.temperature,
                top_p: generation.top_p,
                repetition_penalty: generation.repetition_penalty,
                max_tokens: generation.max_tokens,
                decoding: if generation.sampling {
                    Decoding::Sampled
                } else {
                    Decoding::Greedy
                },
            },
        }
    }
}

/// Loop state between turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Done(TaskStatus),
}

/// Result of a finished task
#[derive(Debug)]
pub struct TaskReport {
    pub task: Task,
    pub status: TaskStatus,
    pub iterations: u32,
}

/// Drives one model through the action protocol until it reports DONE or a
/// bound is hit. Turns run strictly one after another.
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    executor: Executor,
    settings: AgentSettings,
    surface: SurfaceBus,
    cancel: CancellationToken,
}

impl<P: Provider> AgentLoop<P> {
    /// Create a loop with default settings and no attached surface
    pub fn new(provider: P, executor: Executor) -> Self {
        Self {
            provider: Arc::new(provider),
            executor,
            settings: AgentSettings::default(),
            surface: SurfaceBus::detached(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a loop with settings, workspace and shell limits from config
    pub fn with_config(provider: P, config: &Config) -> Self {
        Self::new(provider, Executor::from_config(config))
            .with_settings(AgentSettings::from_config(config))
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_surface(mut self, surface: SurfaceBus) -> Self {
        self.surface = surface;
        self
    }

    /// Token to request a stop; observed only between turns
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run one task to completion
    pub async fn run(&self, task_text: &str) -> Result<TaskReport> {
        tokio::fs::create_dir_all(self.executor.workspace()).await?;

        let context = Context::new(self.settings.preamble.clone(), task_text);
        let mut task = Task::new(context, self.surface.clone());
        let started = Instant::now();
        let mut iterations = 0;

        info!("◆ task {} started in {:?}", task.id, self.executor.workspace());

        let status = loop {
            if let Some((status, halt_line)) = self.bound_reached(iterations, started) {
                task.record(halt_line);
                break status;
            }

            iterations += 1;
            debug!("◆ turn {}", iterations);

            match self.turn(&mut task, iterations).await {
                Ok(LoopState::Running) => {}
                Ok(LoopState::Done(status)) => break status,
                Err(e) => {
                    task.surface().finished("model_unavailable", iterations);
                    return Err(e);
                }
            }
        };

        info!(
            "◆ task {} finished: {} after {} turns, {} files",
            task.id,
            status,
            iterations,
            task.files().len()
        );
        task.surface().finished(status.as_str(), iterations);

        Ok(TaskReport {
            task,
            status,
            iterations,
        })
    }

    /// One full turn: generate, record, parse, execute, check for DONE and stop
    async fn turn(&self, task: &mut Task, iteration: u32) -> Result<LoopState> {
        let prompt = task
            .context()
            .render_window(self.settings.max_context_chars);
        let params = GenerateParams::new(prompt, self.settings.generation.clone());

        let completion = match self.provider.generate(params).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("◆ model unavailable: {}", e);
                task.record(format!("[!] Model unavailable: {}", e));
                return Err(AgentError::ModelUnavailable(e.to_string()));
            }
        };
        let response = completion.text;
        task.record(format!("{}\n{}", RESPONSE_HEADER, response));

        let actions = protocol::parse_with(&response, self.settings.action_order);
        let done = protocol::contains_done(&response);
        if actions.is_empty() && !done {
            warn!("◆ turn {} produced no actions", iteration);
        }

        for action in &actions {
            let result = self.executor.execute(action).await;

            if let Some(output) = result.shell_output() {
                task.context_mut().push_shell_output(output);
            }
            if let (Action::WriteFile { path, content }, ExecutionResult::Written { .. }) =
                (action, &result)
            {
                task.record_file(path, content);
            }
            task.record(result.transcript_line());
        }

        if done {
            task.record(COMPLETION_MARKER);
            return Ok(LoopState::Done(TaskStatus::Completed));
        }

        if self.cancel.is_cancelled() {
            task.record(STOPPED_MARKER);
            return Ok(LoopState::Done(TaskStatus::Cancelled));
        }

        Ok(LoopState::Running)
    }

    /// Iteration or wall-clock bound hit before the next turn, with its halt line
    fn bound_reached(&self, iterations: u32, started: Instant) -> Option<(TaskStatus, String)> {
        let max = self.settings.max_iterations;
        if max > 0 && iterations >= max {
            return Some((
                TaskStatus::IterationLimit,
                format!("[!] Halted: reached the limit of {} iterations", max),
            ));
        }
        match self.settings.max_runtime {
            Some(limit) if started.elapsed() >= limit => Some((
                TaskStatus::TimeLimit,
                format!(
                    "[!] Halted: exceeded the time budget of {} seconds",
                    limit.as_secs()
                ),
            )),
            _ => None,
        }
    }
}
