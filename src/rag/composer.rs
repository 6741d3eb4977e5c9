//! Prompt composition from policy, passages, and conversation history

use crate::models::Message;
use crate::models::MessageRole;
use crate::models::RetrievalResult;

/// Assembles the generation prompt deterministically: system policy first,
/// then labeled reference blocks in retriever order, then the truncated
/// history transcript, then the new query.
pub struct PromptComposer {
    max_history_messages: usize,
    history_char_budget: usize,
}

impl PromptComposer {
    /// Create a composer with a history message cap and character budget
    #[must_use]
    pub const fn new(max_history_messages: usize, history_char_budget: usize) -> Self {
        Self {
            max_history_messages,
            history_char_budget,
        }
    }

    /// Compose the full prompt text
    #[must_use]
    pub fn compose(
        &self,
        system_policy: &str,
        passages: &[RetrievalResult],
        history: &[Message],
        new_query: &str,
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str(system_policy.trim());
        prompt.push_str("\n\n");

        if !passages.is_empty() {
            prompt.push_str("Reference material:\n\n");
            for (idx, passage) in passages.iter().enumerate() {
                prompt.push_str(&format!(
                    "[Reference {} | source: {}]\n{}\n\n",
                    idx + 1,
                    passage.source,
                    passage.content.trim()
                ));
            }
        }

        let recent = truncate_history(history, self.max_history_messages, self.history_char_budget);
        if !recent.is_empty() {
            prompt.push_str("Previous conversation:\n");
            for message in recent {
                prompt.push_str(&format!("{}: {}\n", role_label(message.role), message.content));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("User: {new_query}\nCoach:"));
        prompt
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(12, 4000)
    }
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "User",
        MessageRole::Assistant => "Coach",
    }
}

/// Deterministic suffix truncation over whole messages.
///
/// Keeps at most `max_messages` of the newest messages, then keeps dropping
/// the oldest of those until the summed content length fits `char_budget`.
/// A message is never split; if even the newest message alone exceeds the
/// budget, the result is empty.
#[must_use]
pub fn truncate_history(
    history: &[Message],
    max_messages: usize,
    char_budget: usize,
) -> &[Message] {
    let mut start = history.len().saturating_sub(max_messages);
    let mut used: usize = history[start..]
        .iter()
        .map(|m| m.content.chars().count())
        .sum();

    while start < history.len() && used > char_budget {
        used -= history[start].content.chars().count();
        start += 1;
    }

    &history[start..]
}
