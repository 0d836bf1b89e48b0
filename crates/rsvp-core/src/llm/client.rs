//! LLM API HTTP Client
//!
//! Supports both OpenAI-compatible chat completions and the Anthropic
//! messages API.

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::*;

/// LLM API client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match config.provider {
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            provider: config.provider,
        })
    }

    /// Create a request builder
    pub fn request_builder(&self) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new()
    }

    /// Run a completion and return the reply text
    pub async fn complete(&self, request: CompletionRequest) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi => self.send_openai_request(&request).await,
            LlmProvider::Claude => self.send_claude_request(&request).await,
        }
    }

    async fn send_openai_request(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending request to OpenAI-compatible API: {}", url);

        let body = ChatCompletionRequest::from_request(&self.model, request);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, text);
            return Err(Error::Llm(format!("{}: {}", status, text)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, text)))?;
        parsed
            .text()
            .ok_or_else(|| Error::Llm("Empty completion".to_string()))
    }

    async fn send_claude_request(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        debug!("Sending request to Claude API: {}", url);

        let body = MessagesRequest::from_request(&self.model, request);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, text);
            return Err(Error::Llm(format!("{}: {}", status, text)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, text)))?;
        parsed
            .text()
            .ok_or_else(|| Error::Llm("Empty completion".to_string()))
    }
}
