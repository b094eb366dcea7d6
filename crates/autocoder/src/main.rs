//! autocoder - drive a local language model through a write-and-run loop

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    history_list_command, history_remove_command, history_show_command, init_command,
    run_command, status_command, RunArgs,
};

/// autocoder - local coding agent for your terminal
#[derive(Parser)]
#[command(name = "autocoder")]
#[command(about = "◆ A local-model coding agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and workspace
    Init,
    /// Run one coding task
    Run {
        /// Task description, read from stdin when omitted
        #[arg(short, long)]
        task: Option<String>,
        /// Workspace directory for generated files
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Model name override
        #[arg(long)]
        model: Option<String>,
        /// Maximum number of model turns
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Use greedy decoding
        #[arg(long)]
        greedy: bool,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show configuration and model server status
    Status,
    /// Browse saved tasks
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved tasks, newest first
    List,
    /// Show the transcript and files of one task
    Show {
        /// Task id or a unique prefix of it
        id: String,
    },
    /// Remove a saved task
    Remove {
        /// Task id or a unique prefix of it
        id: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(matches!(cli.command, Commands::Run { verbose: true, .. }));

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Run {
            task,
            workspace,
            model,
            max_iterations,
            greedy,
            verbose: _,
        } => {
            let args = RunArgs {
                task,
                workspace,
                model,
                max_iterations,
                greedy,
            };
            if let Err(e) = run_command(args).await {
                error!("Run failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::History { command } => match command {
            HistoryCommands::List => {
                if let Err(e) = history_list_command().await {
                    error!("History list failed: {:#}", e);
                    std::process::exit(1);
                }
            }
            HistoryCommands::Show { id } => {
                if let Err(e) = history_show_command(&id).await {
                    error!("History show failed: {:#}", e);
                    std::process::exit(1);
                }
            }
            HistoryCommands::Remove { id } => {
                if let Err(e) = history_remove_command(&id).await {
                    error!("History remove failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        },
    }
}
