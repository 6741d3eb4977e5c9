//! Complete RAG pipeline: retrieve -> compose -> generate -> record

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::conversations::ConversationStore;
use crate::errors::FitragError;
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::gateway::GenerationGateway;
use crate::index::VectorIndex;
use crate::models::RetrievalResult;
use crate::rag::prompts::FITNESS_COACH_SYSTEM_PROMPT;
use crate::rag::PromptComposer;
use crate::rag::Retriever;
use crate::rag::DEFAULT_TOP_K;

/// Per-query knobs for the answer path
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// When false, retrieval is skipped and no sources are cited
    pub use_rag: bool,
    pub top_k: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            use_rag: true,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A finished, recorded answer
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub conversation_id: String,
    pub answer: String,
    /// Passages surfaced as citations, in retrieval order
    pub sources: Vec<RetrievalResult>,
}

/// Top-level coordinator for the answer path.
///
/// All collaborators are injected; the service owns no I/O of its own.
pub struct RagService {
    retriever: Retriever,
    composer: PromptComposer,
    generation: Arc<dyn GenerationGateway>,
    store: Arc<ConversationStore>,
    citation_limit: usize,
    system_prompt: String,
}

impl RagService {
    /// Assemble the service from its collaborators
    pub fn new(
        embedding: Arc<dyn EmbeddingGateway>,
        generation: Arc<dyn GenerationGateway>,
        index: Arc<dyn VectorIndex>,
        store: Arc<ConversationStore>,
        config: &AppConfig,
    ) -> Self {
        let retriever = Retriever::new(embedding, index, config.min_score());
        let composer =
            PromptComposer::new(config.max_history_messages(), config.history_char_budget());

        Self {
            retriever,
            composer,
            generation,
            store,
            citation_limit: config.citation_limit(),
            system_prompt: FITNESS_COACH_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Answer a query with default options
    pub async fn answer(&self, query: &str, conversation: Option<&str>) -> Result<RagAnswer> {
        self.answer_with_options(query, conversation, &AnswerOptions::default())
            .await
    }

    /// Answer a query within a conversation.
    ///
    /// `Some(id)` must name an existing conversation; `None` creates one.
    /// Retrieval-path failures degrade to an answer without references;
    /// generation failures are fatal and leave the conversation untouched.
    /// A successful answer is recorded in the store before it is returned.
    pub async fn answer_with_options(
        &self,
        query: &str,
        conversation: Option<&str>,
        options: &AnswerOptions,
    ) -> Result<RagAnswer> {
        info!("Processing query: {query}");

        // Resolve the conversation first so an unknown id fails before any
        // backend call is made
        let conversation_id = match conversation {
            Some(id) => {
                if self.store.get(id).is_none() {
                    return Err(FitragError::ConversationNotFound(id.to_string()));
                }
                id.to_string()
            }
            None => self.store.create(None).id,
        };

        let passages = if options.use_rag {
            match self.retriever.retrieve(query, options.top_k).await {
                Ok(passages) => passages,
                Err(
                    e @ (FitragError::Embedding(_)
                    | FitragError::Index(_)
                    | FitragError::Http(_)),
                ) => {
                    warn!("Retrieval failed, answering without references: {e}");
                    Vec::new()
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!("Retrieval disabled for this query");
            Vec::new()
        };

        debug!("Composing prompt with {} passages", passages.len());
        let history = self.store.history(&conversation_id)?;
        let prompt = self
            .composer
            .compose(&self.system_prompt, &passages, &history, query);

        debug!("Generating answer ({} prompt chars)", prompt.chars().count());
        let answer = self.generation.generate(&prompt, None).await?;

        // A turn only counts once both messages are in the store
        let sources: Vec<RetrievalResult> =
            passages.into_iter().take(self.citation_limit).collect();
        self.store.append_exchange(
            &conversation_id,
            query.to_string(),
            answer.clone(),
            sources.clone(),
        )?;

        info!("Query answered with {} cited sources", sources.len());
        Ok(RagAnswer {
            conversation_id,
            answer,
            sources,
        })
    }

    /// Get the retriever, for direct knowledge search without generation
    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Get the system policy used for every prompt
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
