//! Append-only conversation store
//!
//! Holds ordered message history per conversation id. Appends to one
//! conversation are serialized through the map's per-key exclusive access;
//! operations on different conversations proceed independently. With a
//! storage directory configured, every mutation writes the conversation
//! back to `<dir>/<id>.json`.

use std::path::PathBuf;

use chrono::Duration;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::errors::FitragError;
use crate::errors::Result;
use crate::models::Conversation;
use crate::models::ConversationSummary;
use crate::models::Message;
use crate::models::MessageRole;
use crate::models::RetrievalResult;

pub struct ConversationStore {
    conversations: DashMap<String, Conversation>,
    storage_dir: Option<PathBuf>,
}

impl ConversationStore {
    /// Create a purely in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            storage_dir: None,
        }
    }

    /// Create a store persisted under `dir`, loading any conversations a
    /// previous run left there. Unreadable files are logged and skipped.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let conversations = DashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(FitragError::from)
                .and_then(|content| Ok(serde_json::from_str::<Conversation>(&content)?))
            {
                Ok(conversation) => {
                    conversations.insert(conversation.id.clone(), conversation);
                }
                Err(e) => warn!("Skipping unreadable conversation {}: {e}", path.display()),
            }
        }

        debug!("Loaded {} conversations from {}", conversations.len(), dir.display());

        Ok(Self {
            conversations,
            storage_dir: Some(dir),
        })
    }

    /// Create a conversation; the title defaults to a timestamp placeholder
    pub fn create(&self, title: Option<String>) -> Conversation {
        let now = Utc::now();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Conversation {}", now.format("%Y-%m-%d %H:%M")));

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.conversations
            .insert(conversation.id.clone(), conversation.clone());
        self.persist(&conversation);
        conversation
    }

    /// Fetch a conversation by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.conversations.get(id).map(|c| c.clone())
    }

    /// Append one message; fails for an unknown id, never creates
    pub fn append(
        &self,
        id: &str,
        role: MessageRole,
        content: String,
        sources: Vec<RetrievalResult>,
    ) -> Result<Message> {
        let mut entry = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| FitragError::ConversationNotFound(id.to_string()))?;

        let message = push_message(&mut entry, role, content, sources);
        let snapshot = entry.clone();
        drop(entry);

        self.persist(&snapshot);
        Ok(message)
    }

    /// Record a full user/assistant turn under one critical section, so a
    /// reader never observes the question without its answer
    pub fn append_exchange(
        &self,
        id: &str,
        user_content: String,
        answer: String,
        sources: Vec<RetrievalResult>,
    ) -> Result<()> {
        let mut entry = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| FitragError::ConversationNotFound(id.to_string()))?;

        push_message(&mut entry, MessageRole::User, user_content, Vec::new());
        push_message(&mut entry, MessageRole::Assistant, answer, sources);
        let snapshot = entry.clone();
        drop(entry);

        self.persist(&snapshot);
        Ok(())
    }

    /// Full chronological history; truncation for prompts happens elsewhere
    pub fn history(&self, id: &str) -> Result<Vec<Message>> {
        self.conversations
            .get(id)
            .map(|c| c.messages.clone())
            .ok_or_else(|| FitragError::ConversationNotFound(id.to_string()))
    }

    /// Conversation summaries, most recently updated first
    #[must_use]
    pub fn list(&self, limit: usize) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(|c| c.summary())
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries.truncate(limit);
        summaries
    }

    /// Remove a conversation and its messages; returns whether it existed
    pub fn delete(&self, id: &str) -> bool {
        let existed = self.conversations.remove(id).is_some();
        if existed {
            if let Some(dir) = &self.storage_dir {
                let path = dir.join(format!("{id}.json"));
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {e}", path.display());
                    }
                }
            }
        }
        existed
    }

    /// Number of stored conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    fn persist(&self, conversation: &Conversation) {
        if let Some(dir) = &self.storage_dir {
            let path = dir.join(format!("{}.json", conversation.id));
            let result = serde_json::to_string_pretty(conversation)
                .map_err(FitragError::from)
                .and_then(|json| Ok(std::fs::write(&path, json)?));
            if let Err(e) = result {
                warn!("Failed to persist conversation {}: {e}", conversation.id);
            }
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Append under the caller's exclusive entry access, advancing `updated_at`
/// strictly monotonically even on coarse clocks
fn push_message(
    conversation: &mut Conversation,
    role: MessageRole,
    content: String,
    sources: Vec<RetrievalResult>,
) -> Message {
    let now = Utc::now();
    let timestamp = if now > conversation.updated_at {
        now
    } else {
        conversation.updated_at + Duration::nanoseconds(1)
    };

    let message = Message {
        role,
        content,
        sources,
        timestamp,
    };
    conversation.messages.push(message.clone());
    conversation.updated_at = timestamp;
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_id_and_placeholder_title() {
        let store = ConversationStore::new();
        let conversation = store.create(None);
        assert!(!conversation.id.is_empty());
        assert!(conversation.title.starts_with("Conversation "));
        assert!(store.get(&conversation.id).is_some());

        let named = store.create(Some("Leg day plan".to_string()));
        assert_eq!(named.title, "Leg day plan");
    }

    #[test]
    fn test_history_length_and_order_match_appends() {
        let store = ConversationStore::new();
        let id = store.create(None).id;

        for i in 0..5 {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            store
                .append(&id, role, format!("message {i}"), Vec::new())
                .unwrap();
        }

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 5);
        for (i, message) in history.iter().enumerate() {
            assert_eq!(message.content, format!("message {i}"));
        }
    }

    #[test]
    fn test_append_to_unknown_id_fails_without_creating() {
        let store = ConversationStore::new();
        let err = store
            .append("missing", MessageRole::User, "hi".to_string(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, FitragError::ConversationNotFound(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_updated_at_advances_with_each_append() {
        let store = ConversationStore::new();
        let id = store.create(None).id;

        let mut last = store.get(&id).unwrap().updated_at;
        for i in 0..3 {
            store
                .append(&id, MessageRole::User, format!("m{i}"), Vec::new())
                .unwrap();
            let now = store.get(&id).unwrap().updated_at;
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn test_append_exchange_records_both_messages() {
        let store = ConversationStore::new();
        let id = store.create(None).id;

        let sources = vec![RetrievalResult {
            content: "passage".to_string(),
            source: "guide.md".to_string(),
            score: 0.9,
        }];
        store
            .append_exchange(&id, "question".to_string(), "answer".to_string(), sources)
            .unwrap();

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert!(history[0].sources.is_empty());
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].sources.len(), 1);
    }

    #[test]
    fn test_list_orders_by_recent_update() {
        let store = ConversationStore::new();
        let first = store.create(Some("first".to_string())).id;
        let second = store.create(Some("second".to_string())).id;

        store
            .append(&first, MessageRole::User, "bump".to_string(), Vec::new())
            .unwrap();

        let listed = store.list(10);
        assert_eq!(listed[0].id, first);
        assert_eq!(listed[1].id, second);

        assert_eq!(store.list(1).len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = ConversationStore::new();
        let id = store.create(None).id;
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let id = {
            let store = ConversationStore::with_dir(dir.path()).unwrap();
            let id = store.create(Some("Cutting phase".to_string())).id;
            store
                .append_exchange(&id, "q".to_string(), "a".to_string(), Vec::new())
                .unwrap();
            id
        };

        let reloaded = ConversationStore::with_dir(dir.path()).unwrap();
        let conversation = reloaded.get(&id).unwrap();
        assert_eq!(conversation.title, "Cutting phase");
        assert_eq!(conversation.messages.len(), 2);

        assert!(reloaded.delete(&id));
        let reloaded_again = ConversationStore::with_dir(dir.path()).unwrap();
        assert!(reloaded_again.get(&id).is_none());
    }
}
