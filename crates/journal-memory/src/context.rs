use journal_core::Message;

/// Builds the bounded prompt sent to a chat completion provider.
///
/// At most `history_window` recent messages are considered per turn, and
/// two slots of that window are reserved for the instructions and journal
/// sections, so the prompt embeds at most `history_window - 2` messages.
/// This cap is the system's token cost control.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HISTORY_WINDOW)
    }
}

impl PromptBuilder {
    pub const DEFAULT_HISTORY_WINDOW: usize = 10;

    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// The slice of history a single turn may consider: the most recent
    /// `history_window` messages, in chronological order.
    pub fn window<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        let start = history.len().saturating_sub(self.history_window);
        &history[start..]
    }

    /// Assemble the outbound prompt. Empty journal text or empty history
    /// simply omit their sections; there is no failure mode here.
    pub fn build(&self, journal_entry: &str, history: &[Message], new_message: &str) -> String {
        let window = self.window(history);
        let embed_budget = self.history_window.saturating_sub(2);
        let start = window.len().saturating_sub(embed_budget);
        let embedded = &window[start..];

        let mut prompt = String::from(
            "You are a supportive journaling assistant. Help the writer reflect \
             on their journal entry with warmth and honesty.",
        );

        let entry = journal_entry.trim();
        if !entry.is_empty() {
            prompt.push_str("\n\nJournal entry:\n");
            prompt.push_str(entry);
        }

        if !embedded.is_empty() {
            prompt.push_str("\n\nPrevious conversation:");
            for message in embedded {
                let speaker = if message.is_user { "User" } else { "Assistant" };
                prompt.push_str(&format!("\n{}: {}", speaker, message.content.trim()));
            }
        }

        prompt.push_str("\n\nUser question:\n");
        prompt.push_str(new_message.trim());

        prompt.push_str("\n\nRespond conversationally, grounded in the journal entry above.");

        prompt
    }
}
