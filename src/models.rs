use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A knowledge passage returned by the retriever, with provenance.
///
/// Derived per query and never persisted on its own; assistant messages keep
/// a copy of the passages they cited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub source: String,
    /// Similarity score normalized to [0, 1]
    pub score: f32,
}

/// A single turn entry in a conversation; append-only once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Passages cited by an assistant answer; always empty for user messages
    #[serde(default)]
    pub sources: Vec<RetrievalResult>,
    pub timestamp: DateTime<Utc>,
}

/// An ordered, append-only dialogue between the user and the coach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// List-view projection without the message bodies
    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Conversation metadata for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bounded slice of a source document, the unit of embedding and retrieval.
///
/// The id is deterministic over (source, sequence, text) so re-ingesting an
/// unchanged document upserts the same entries instead of duplicating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub sequence_index: usize,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Read-only projection over the vector index and ingestion bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub collection_name: String,
    pub embedding_model: String,
}

/// Fixed-shape health record reported by each backend capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub reachable: bool,
    pub ready: bool,
    pub detail: String,
}

impl ServiceHealth {
    /// Both reachable and ready
    #[must_use]
    pub fn ok(&self) -> bool {
        self.reachable && self.ready
    }
}
