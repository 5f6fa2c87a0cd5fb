use chrono::{Duration, Utc};
use journal_config::AssistantConfig;
use journal_core::{
    ChatCompletionClient, ConversationContext, JournalError, Message, Provider, Result,
};
use journal_memory::{ConversationCache, ConversationStore, PromptBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Orchestrates one assistant turn: resolve credentials, reconstruct the
/// conversation, build the bounded prompt, call the provider, and persist
/// the new exchange.
pub struct ConversationService {
    config: Arc<AssistantConfig>,
    cache: ConversationCache,
    prompt_builder: PromptBuilder,
    clients: HashMap<Provider, Arc<dyn ChatCompletionClient>>,
}

impl ConversationService {
    pub fn new(config: AssistantConfig) -> Self {
        let clients: Vec<Arc<dyn ChatCompletionClient>> = vec![
            Arc::from(journal_client::client_for(Provider::OpenAi)),
            Arc::from(journal_client::client_for(Provider::Anthropic)),
        ];
        Self::with_clients(config, clients)
    }

    /// Build the service around caller-supplied clients. Used by `new` and
    /// by tests that stub the provider.
    pub fn with_clients(
        config: AssistantConfig,
        clients: Vec<Arc<dyn ChatCompletionClient>>,
    ) -> Self {
        let store = ConversationStore::new(config.paths.cache_dir.clone());
        let cache = ConversationCache::new(store, config.memory.cache_capacity);
        let prompt_builder = PromptBuilder::new(config.memory.history_window);
        let clients = clients
            .into_iter()
            .map(|client| (client.provider(), client))
            .collect();

        Self {
            config: Arc::new(config),
            cache,
            prompt_builder,
            clients,
        }
    }

    /// Run a full turn and return the assistant's reply.
    ///
    /// `existing_messages` seeds a fresh context when nothing is cached or
    /// persisted for `conversation_id` yet. On any failure before the
    /// provider replies, no conversation state is mutated.
    #[instrument(skip(self, message, journal_entry, existing_messages))]
    pub async fn send_message(
        &self,
        message: &str,
        provider: Provider,
        journal_entry: &str,
        conversation_id: Uuid,
        existing_messages: Vec<Message>,
    ) -> Result<String> {
        let api_key = self.config.api_key_for(provider).ok_or_else(|| {
            JournalError::Auth(format!("no API key configured for provider {}", provider))
        })?;

        let client = self.clients.get(&provider).ok_or_else(|| {
            JournalError::Config(format!("no client registered for provider {}", provider))
        })?;

        let context = match self.cache.get(&conversation_id).await {
            Some(context) => context,
            None => {
                debug!("No stored context for {}, starting fresh", conversation_id);
                ConversationContext::new(existing_messages, journal_entry, provider)
            }
        };

        let prompt = self
            .prompt_builder
            .build(journal_entry, &context.messages, message);

        let reply = client.send(&prompt, &api_key).await?;

        let mut messages = context.messages.clone();
        messages.push(Message::user(message, provider));
        messages.push(Message::assistant(reply.clone(), provider));
        self.cache
            .put(conversation_id, context.with_messages(messages))
            .await;

        info!("Completed turn for conversation {}", conversation_id);
        Ok(reply)
    }

    /// Forget a conversation in memory and on disk.
    pub async fn clear_conversation(&self, id: &Uuid) {
        info!("Clearing conversation {}", id);
        self.cache.remove(id).await;
    }

    /// Full message history for a conversation, oldest first. Unknown ids
    /// yield an empty history.
    pub async fn get_conversation_history(&self, id: &Uuid) -> Vec<Message> {
        match self.cache.get(id).await {
            Some(context) => context.messages,
            None => Vec::new(),
        }
    }

    /// Sweep disk records older than the configured retention period.
    /// Drop the handle for fire-and-forget, or await it for the count.
    pub fn cleanup(&self) -> JoinHandle<usize> {
        let cutoff = Utc::now() - Duration::days(self.config.memory.retention_days);
        info!("Sweeping conversations created before {}", cutoff);
        self.cache.cleanup(cutoff)
    }

    /// Flush all pending disk work. Call before process exit so an
    /// acknowledged turn or clear is never lost to runtime teardown.
    pub async fn shutdown(self) {
        self.cache.shutdown().await;
    }
}
