//! RAG (Retrieval-Augmented Generation) orchestration
//!
//! This module drives the answer path end to end:
//! - semantic retrieval over the vector index
//! - prompt composition from policy, passages, and conversation history
//! - answer generation through the generation gateway
//! - recording the finished turn, with citations, in the conversation store
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fitrag::config::AppConfig;
//! use fitrag::conversations::ConversationStore;
//! use fitrag::gateway::OllamaClient;
//! use fitrag::index::MemoryVectorIndex;
//! use fitrag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let ollama = Arc::new(OllamaClient::new(&config)?);
//!     let index = Arc::new(MemoryVectorIndex::new(config.collection_name()));
//!     let store = Arc::new(ConversationStore::new());
//!
//!     let service = RagService::new(ollama.clone(), ollama, index, store, &config);
//!     let reply = service.answer("How often should a beginner train?", None).await?;
//!     println!("{}", reply.answer);
//!     Ok(())
//! }
//! ```

pub mod composer;
pub mod pipeline;
pub mod prompts;
pub mod retriever;

pub use composer::truncate_history;
pub use composer::PromptComposer;
pub use pipeline::AnswerOptions;
pub use pipeline::RagAnswer;
pub use pipeline::RagService;
pub use retriever::Retriever;
pub use retriever::DEFAULT_TOP_K;
