use async_trait::async_trait;
use journal_core::{ChatCompletionClient, JournalError, Provider, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatCompletionClient for AnthropicClient {
    async fn send(&self, prompt: &str, api_key: &str) -> Result<String> {
        debug!("Sending messages request to Anthropic");

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(crate::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::error_for_status(status));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| JournalError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(JournalError::MalformedResponse(
                "response contained no text content".into(),
            ));
        }

        Ok(text)
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}
