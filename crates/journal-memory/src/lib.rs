pub mod cache;
pub mod context;
pub mod storage;

pub use cache::ConversationCache;
pub use context::PromptBuilder;
pub use storage::ConversationStore;
