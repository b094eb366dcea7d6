//! OpenAI-compatible `/completions` backend (vLLM, llama.cpp server, ...)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

use crate::{
    status_error, Completion, GenerateParams, Provider, ProviderError, Result, Usage,
};

/// Provider for servers exposing the plain text-completion endpoint
pub struct CompletionsProvider {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
}

impl CompletionsProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
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

        json!({
            "model": model,
            "prompt": &params.prompt,
            "max_tokens": options.max_tokens,
            "temperature": options.effective_temperature(),
            "top_p": options.top_p,
            "repetition_penalty": options.repetition_penalty,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Completion> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let text = choice["text"]
            .as_str()
            .ok_or(ProviderError::InvalidResponse)?
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            Usage {
                prompt_tokens: usage
                    .get("prompt_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                completion_tokens: usage
                    .get("completion_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
            }
        } else {
            Usage::default()
        };

        Ok(Completion {
            text,
            finish_reason: choice["finish_reason"]
                .as_str()
                .unwrap_or("stop")
                .to_string(),
            usage,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

#[async_trait]
impl Provider for CompletionsProvider {
    async fn generate(&self, params: GenerateParams) -> Result<Completion> {
        trace!("◆ completions request to {}", self.api_base);

        let url = format!("{}/completions", self.api_base);
        let request = self.build_request(&params);

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;

        let completion = self.parse_response(json)?;
        debug!("◆ completion: {} chars", completion.text.len());
        Ok(completion)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/models", self.api_base);
        let response = self.authorize(self.client.get(&url)).send().await?;
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
