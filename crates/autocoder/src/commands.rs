//! autocoder command implementations

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use autocoder_agent::{AgentError, AgentLoop};
use autocoder_bus::{EventKind, SurfaceBus, SurfaceDispatcher, SurfaceEvent};
use autocoder_config::{self, Backend, Config};
use autocoder_history::{TaskRecord, TaskStore};
use autocoder_provider::{CompletionsProvider, OllamaProvider, Provider};

/// Options of the `run` command
pub struct RunArgs {
    pub task: Option<String>,
    pub workspace: Option<PathBuf>,
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
    pub greedy: bool,
}

impl RunArgs {
    /// Command-line overrides win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(workspace) = &self.workspace {
            config.agent.workspace = workspace.to_string_lossy().into_owned();
        }
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.agent.max_iterations = max_iterations;
        }
        if self.greedy {
            config.generation.sampling = false;
        }
    }
}

/// Build the model provider selected in config
fn build_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let timeout = Duration::from_secs(config.model.request_timeout_secs);

    let provider: Box<dyn Provider> = match config.model.backend {
        Backend::Ollama => Box::new(
            OllamaProvider::new(config.api_base(), config.model_name(), timeout)
                .context("failed to build Ollama client")?,
        ),
        Backend::OpenaiCompat => Box::new(
            CompletionsProvider::new(
                config.api_base(),
                config.api_key(),
                config.model_name(),
                timeout,
            )
            .context("failed to build completions client")?,
        ),
    };
    Ok(provider)
}

async fn read_task_from_stdin() -> Result<String> {
    let mut task = String::new();
    tokio::io::stdin()
        .read_to_string(&mut task)
        .await
        .context("failed to read task from stdin")?;
    Ok(task)
}

/// How the interrupt watcher ended
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// The signal source failed before a second press
    Closed,
    /// A second press arrived while the stop was pending
    Abort,
}

/// The first signal stops the loop after its current turn, the second aborts
async fn watch_interrupts<F, Fut>(token: CancellationToken, mut next_signal: F) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return Interrupt::Closed;
    }
    info!("◆ stop requested");
    println!("\n◆ Stopping after the current turn... (Ctrl-C again to quit now)");
    token.cancel();

    if next_signal().await.is_err() {
        return Interrupt::Closed;
    }
    warn!("◆ second interrupt, aborting");
    Interrupt::Abort
}

/// Initialize config and workspace
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing autocoder...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = autocoder_config::init()
        .await
        .context("failed to initialize config")?;

    println!("Config:    {}", autocoder_config::config_path().display());
    println!("Workspace: {}", config.workspace_path().display());
    println!("\n◆ autocoder initialized");
    println!("\nNext steps:");
    println!(
        "  1. Start a model server ({} at {})",
        config.model.backend.as_str(),
        config.api_base()
    );
    println!("  2. Run a task: autocoder run -t \"Write a hello world script in python\"");

    Ok(())
}

/// Run one task and print the transcript as it grows
pub async fn run_command(args: RunArgs) -> Result<()> {
    let mut config = Config::load().await.context("failed to load config")?;
    args.apply(&mut config);

    let task = match &args.task {
        Some(task) => task.clone(),
        None => read_task_from_stdin().await?,
    };
    let task = task.trim();
    if task.is_empty() {
        anyhow::bail!("no task given: pass -t or pipe a description on stdin");
    }

    let provider = build_provider(&config)?;

    let (surface, receiver) = SurfaceBus::channel();
    let mut dispatcher = SurfaceDispatcher::new(receiver);
    dispatcher.on(EventKind::Line, |event| {
        if let SurfaceEvent::Line { text, .. } = event {
            println!("{}", text);
        }
    });
    dispatcher.on(EventKind::Finished, |event| {
        if let SurfaceEvent::Finished { status, iterations } = event {
            println!("\n◆ {} after {} turns", status, iterations);
        }
    });
    let printer = tokio::spawn(dispatcher.run());

    let agent = AgentLoop::with_config(provider, &config).with_surface(surface);
    let token = agent.cancellation_token();
    let stop = tokio::spawn(async move {
        if watch_interrupts(token, tokio::signal::ctrl_c).await == Interrupt::Abort {
            eprintln!("◆ Aborted");
            std::process::exit(130);
        }
    });

    println!("◆ Workspace: {}", agent.executor().workspace().display());
    let result = agent.run(task).await;
    stop.abort();
    drop(agent);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            let _ = printer.await;
            return match e {
                AgentError::ModelUnavailable(reason) => Err(anyhow::anyhow!(
                    "model unavailable at {}: {}",
                    config.api_base(),
                    reason
                )),
                other => Err(other).context("task failed"),
            };
        }
    };

    let workspace = config.workspace_path();
    let record = TaskRecord::from_report(&report, &workspace);
    drop(report);

    if let Err(e) = printer.await {
        warn!("◆ surface printer failed: {}", e);
    }

    if record.files.is_empty() {
        println!("◆ No files generated");
    } else {
        println!("◆ Generated files in {}:", workspace.display());
        for file in &record.files {
            println!("  {} ({} bytes)", file.path, file.bytes);
        }
    }

    // a finished run is not failed by a history write error
    match TaskStore::new(autocoder_config::tasks_dir()).save(&record).await {
        Ok(_) => println!("◆ Task saved as {}", record.id),
        Err(e) => warn!("◆ failed to save task {}: {}", record.id, e),
    }

    Ok(())
}

/// List saved tasks
pub async fn history_list_command() -> Result<()> {
    let store = TaskStore::new(autocoder_config::tasks_dir());
    let tasks = store.list().await;

    if tasks.is_empty() {
        println!("No saved tasks");
    } else {
        println!("Saved tasks:");
        for task in tasks {
            println!(
                "  {} - {} ({}, {} turns, {} files, {})",
                task.id,
                task.task,
                task.status,
                task.iterations,
                task.files,
                task.finished_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    Ok(())
}

/// Print one saved task
pub async fn history_show_command(id: &str) -> Result<()> {
    let store = TaskStore::new(autocoder_config::tasks_dir());
    let record = store
        .load(id)
        .await
        .with_context(|| format!("task {} not found", id))?;

    println!("◆ Task {}", record.id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Task:      {}", record.task);
    println!("Status:    {} after {} turns", record.status, record.iterations);
    println!("Workspace: {}", record.workspace);
    println!("Finished:  {}", record.finished_at.format("%Y-%m-%d %H:%M:%S"));
    println!();
    for line in &record.transcript {
        println!("{}", line);
    }
    println!();
    if record.files.is_empty() {
        println!("◆ No files generated");
    } else {
        println!("◆ Files:");
        for file in &record.files {
            println!("  {} ({} bytes)", file.path, file.bytes);
        }
    }

    Ok(())
}

/// Remove one saved task
pub async fn history_remove_command(id: &str) -> Result<()> {
    let store = TaskStore::new(autocoder_config::tasks_dir());

    if store
        .delete(id)
        .await
        .with_context(|| format!("failed to remove task {}", id))?
    {
        println!("✓ Task {} removed", id);
    } else {
        println!("✗ Task {} not found", id);
    }

    Ok(())
}

/// Show configuration and model server status
pub async fn status_command() -> Result<()> {
    let config_path = autocoder_config::config_path();

    println!("◆ autocoder Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("failed to load config")?;
    let workspace = config.workspace_path();
    println!(
        "Workspace: {} {}",
        workspace.display(),
        if workspace.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );
    println!("Backend:   {} at {}", config.model.backend.as_str(), config.api_base());
    println!("Model:     {}", config.model_name());

    let provider = build_provider(&config)?;
    match provider.ping().await {
        Ok(()) => println!("Server:    [OK]"),
        Err(e) => println!("Server:    [Unreachable] {}", e),
    }

    println!(
        "Limits:    {} turns, {}s runtime, {}s shell timeout",
        config.agent.max_iterations, config.agent.max_runtime_secs, config.agent.shell_timeout_secs
    );

    Ok(())
}
