//! Configuration management for autocoder
//!
//! Loads and saves the model, generation and agent settings from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, ensure_dir, expand_home, tasks_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which inference server speaks for the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Ollama `/api/generate`
    #[default]
    Ollama,
    /// OpenAI-compatible `/completions` (vLLM, llama.cpp server, ...)
    OpenaiCompat,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ollama => "ollama",
            Backend::OpenaiCompat => "openai_compat",
        }
    }
}

/// Language model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            api_base: None,
            api_key: None,
            name: default_model_name(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_model_name() -> String {
    "deepseek-coder:6.7b-instruct".to_string()
}

fn default_request_timeout() -> u64 {
    600
}

/// Sampling parameters passed with every generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// `false` selects greedy decoding
    #[serde(default = "default_sampling")]
    pub sampling: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            max_tokens: default_max_tokens(),
            sampling: default_sampling(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_repetition_penalty() -> f32 {
    1.1
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_sampling() -> bool {
    true
}

/// How parsed actions are ordered before execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionOrderSetting {
    /// All file writes, then all shell commands, then all messages
    #[default]
    Grouped,
    /// Textual order of the blocks in the response
    Interleaved,
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Wall-clock budget for one task, 0 disables it
    #[serde(default = "default_max_runtime")]
    pub max_runtime_secs: u64,
    /// 0 disables the shell timeout
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
    /// 0 keeps all shell output
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    /// 0 sends the full context every turn
    #[serde(default)]
    pub max_context_chars: usize,
    #[serde(default)]
    pub action_order: ActionOrderSetting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            max_iterations: default_max_iterations(),
            max_runtime_secs: default_max_runtime(),
            shell_timeout_secs: default_shell_timeout(),
            max_output_chars: default_max_output_chars(),
            max_context_chars: 0,
            action_order: ActionOrderSetting::default(),
            preamble: None,
        }
    }
}

fn default_workspace() -> String {
    "~/.autocoder/workspace".to_string()
}

fn default_max_iterations() -> u32 {
    20
}

fn default_max_runtime() -> u64 {
    1800
}

fn default_shell_timeout() -> u64 {
    120
}

fn default_max_output_chars() -> usize {
    16_000
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ no config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("◆ loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Workspace directory with `~` expanded
    pub fn workspace_path(&self) -> PathBuf {
        expand_home(&self.agent.workspace)
    }

    /// Base URL of the inference server
    pub fn api_base(&self) -> String {
        if let Some(base) = self.model.api_base.as_deref() {
            let base = base.trim_end_matches('/');
            if !base.is_empty() {
                return base.to_string();
            }
        }
        match self.model.backend {
            Backend::Ollama => "http://localhost:11434".to_string(),
            Backend::OpenaiCompat => "http://localhost:8000/v1".to_string(),
        }
    }

    /// API key, if one is set and non-empty
    pub fn api_key(&self) -> Option<String> {
        self.model.api_key.clone().filter(|k| !k.is_empty())
    }

    pub fn model_name(&self) -> String {
        self.model.name.clone()
    }
}

/// Write the default config if absent and create the workspace
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ config written to {:?}", config_path);
    }

    let config = Config::load_from(&config_path).await?;
    let workspace = config.workspace_path();
    ensure_dir(&workspace).await?;
    info!("◆ workspace ready at {:?}", workspace);

    Ok(config)
}
