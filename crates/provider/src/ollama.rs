//! Ollama backend
//!
//! Uses the non-streaming `/api/generate` endpoint in raw mode so the prompt
//! reaches the model exactly as the agent serialized it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

use crate::{
    status_error, Completion, Decoding, GenerateParams, Provider, ProviderError, Result, Usage,
};

/// Provider backed by an Ollama server
pub struct OllamaProvider {
    client: Client,
    api_base: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
        })
    }

    fn build_request(&self, params: &GenerateParams) -> serde_json::Value {
        let options = &params.options;
        let model = if options.model.is_empty() {
            self.default_model.clone()
        } else {
            options.model.clone()
        };

        let mut sampling = json!({
            "temperature": options.effective_temperature(),
            "top_p": options.top_p,
            "repeat_penalty": options.repetition_penalty,
            "num_predict": options.max_tokens,
        });
        if options.decoding == Decoding::Greedy {
            sampling["top_k"] = json!(1);
        }

        json!({
            "model": model,
            "prompt": &params.prompt,
            "stream": false,
            "raw": true,
            "options": sampling,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Completion> {
        let text = json["response"]
            .as_str()
            .ok_or(ProviderError::InvalidResponse)?
            .to_string();

        Ok(Completion {
            text,
            finish_reason: json["done_reason"].as_str().unwrap_or("stop").to_string(),
            usage: Usage {
                prompt_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
                completion_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
            },
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn generate(&self, params: GenerateParams) -> Result<Completion> {
        trace!("◆ ollama request to {}", self.api_base);

        let url = format!("{}/api/generate", self.api_base);
        let request = self.build_request(&params);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;

        let completion = self.parse_response(json)?;
        debug!(
            "◆ ollama completion: {} chars, {} tokens",
            completion.text.len(),
            completion.usage.completion_tokens
        );
        Ok(completion)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.api_base);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Api(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}
