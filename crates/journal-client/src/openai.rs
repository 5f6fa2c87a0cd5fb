use async_trait::async_trait;
use journal_core::{ChatCompletionClient, JournalError, Provider, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiClient {
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

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatCompletionClient for OpenAiClient {
    async fn send(&self, prompt: &str, api_key: &str) -> Result<String> {
        debug!("Sending chat completion request to OpenAI");

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(crate::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::error_for_status(status));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| JournalError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| JournalError::MalformedResponse("response contained no choices".into()))
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}
