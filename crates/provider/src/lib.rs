//! Language model providers
//!
//! A provider turns one prompt string into one completion string. Backends
//! talk to a local inference server over HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;

pub mod completions;
pub mod ollama;

pub use completions::CompletionsProvider;
pub use ollama::OllamaProvider;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model server rejected request: {0}")]
    Api(String),

    #[error("invalid response from model server")]
    InvalidResponse,

    #[error("rate limited by model server")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Decoding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoding {
    #[default]
    Sampled,
    /// Always pick the most likely token
    Greedy,
}

/// Sampling options for one generation
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub max_tokens: u32,
    pub decoding: Decoding,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            top_p: 0.95,
            repetition_penalty: 1.1,
            max_tokens: 1024,
            decoding: Decoding::Sampled,
        }
    }
}

impl GenerateOptions {
    /// Temperature actually sent: greedy decoding forces zero
    pub fn effective_temperature(&self) -> f32 {
        match self.decoding {
            Decoding::Sampled => self.temperature,
            Decoding::Greedy => 0.0,
        }
    }
}

/// One generation request
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub prompt: String,
    pub options: GenerateOptions,
}

impl GenerateParams {
    pub fn new(prompt: impl Into<String>, options: GenerateOptions) -> Self {
        Self {
            prompt: prompt.into(),
            options,
        }
    }
}

/// Token accounting reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Model output for one prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Language model collaborator
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, params: GenerateParams) -> Result<Completion>;
    fn default_model(&self) -> String;
    /// Check that the model server answers
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Box<T> {
    async fn generate(&self, params: GenerateParams) -> Result<Completion> {
        (**self).generate(params).await
    }

    fn default_model(&self) -> String {
        (**self).default_model()
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

/// Longest server error body quoted in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Pull a human-readable error message out of a JSON error body
fn json_error(json: &serde_json::Value) -> Option<String> {
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .map(str::to_string)
}

/// Error for a non-success reply. The body is often not JSON (proxies,
/// overloaded servers), so it is read as text and parsed leniently.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited;
    }

    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json_error(&json),
        Err(_) => {
            let text = body.trim();
            (!text.is_empty()).then(|| text.chars().take(MAX_ERROR_BODY_CHARS).collect())
        }
    };
    ProviderError::Api(message.unwrap_or_else(|| status.to_string()))
}
