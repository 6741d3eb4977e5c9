//! fitrag: a fitness-coaching RAG engine over a local Ollama backend
//!
//! The crate is organized around three tightly coupled pieces: the
//! [`knowledge`] ingestion pipeline fills the [`index`], the [`rag`]
//! orchestrator retrieves from it and generates answers through the
//! [`gateway`], and [`conversations`] records the dialogue.

pub mod config;
pub mod conversations;
pub mod errors;
pub mod gateway;
pub mod index;
pub mod knowledge;
pub mod logging;
pub mod models;
pub mod rag;

pub use config::AppConfig;
pub use errors::FitragError;
pub use errors::Result;
