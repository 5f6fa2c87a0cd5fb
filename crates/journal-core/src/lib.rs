use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat completion backend a conversation is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// A single turn in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
}

impl Message {
    pub fn user(content: impl Into<String>, provider: Provider) -> Self {
        Self {
            content: content.into(),
            is_user: true,
            timestamp: Utc::now(),
            provider,
        }
    }

    pub fn assistant(content: impl Into<String>, provider: Provider) -> Self {
        Self {
            content: content.into(),
            is_user: false,
            timestamp: Utc::now(),
            provider,
        }
    }
}

/// Full state of one conversation: message history in chronological order
/// plus the journal entry it is anchored to.
///
/// Value type: appending a turn produces a new context via
/// [`ConversationContext::with_messages`]; `created_at` is fixed at first
/// creation and survives every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub messages: Vec<Message>,
    pub journal_entry: String,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(
        messages: Vec<Message>,
        journal_entry: impl Into<String>,
        provider: Provider,
    ) -> Self {
        Self {
            messages,
            journal_entry: journal_entry.into(),
            provider,
            created_at: Utc::now(),
        }
    }

    /// New context with a replaced message history, keeping the original
    /// `created_at`.
    pub fn with_messages(&self, messages: Vec<Message>) -> Self {
        Self {
            messages,
            journal_entry: self.journal_entry.clone(),
            provider: self.provider,
            created_at: self.created_at,
        }
    }
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error (status {0})")]
    Server(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JournalError>;

/// Outbound capability the service consumes. The wire protocol lives
/// behind this seam; the core only sees a prompt in and a reply out.
#[async_trait::async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn send(&self, prompt: &str, api_key: &str) -> Result<String>;

    fn provider(&self) -> Provider;
}
