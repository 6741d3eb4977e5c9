//! Model backend gateways
//!
//! The engine talks to its model backend through two narrow capabilities:
//! embedding text into vectors and generating a completion from a prompt.
//! Both are traits so the orchestrator can be wired against fakes in tests
//! and against [`OllamaClient`] in production.

pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::ServiceHealth;

/// Maps text to a fixed-length embedding vector
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Probe the backend for reachability and model readiness
    async fn health(&self) -> ServiceHealth;
}

/// Produces a completion for a composed prompt
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate a completion; `system` optionally overrides the model's
    /// system prompt
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    /// Probe the backend for reachability and model readiness
    async fn health(&self) -> ServiceHealth;
}
