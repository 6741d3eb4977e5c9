//! Semantic retrieval over the vector index

use std::sync::Arc;

use tracing::debug;

use crate::errors::FitragError;
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::index::VectorIndex;
use crate::models::RetrievalResult;

/// Default number of passages returned by a retrieval
pub const DEFAULT_TOP_K: usize = 5;

/// Embeds a query and ranks the nearest knowledge passages
pub struct Retriever {
    embedding: Arc<dyn EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
    min_score: f32,
}

impl Retriever {
    /// Create a retriever; `min_score` is the relevance floor below which
    /// passages are dropped (0.0 keeps everything)
    pub fn new(
        embedding: Arc<dyn EmbeddingGateway>,
        index: Arc<dyn VectorIndex>,
        min_score: f32,
    ) -> Self {
        Self {
            embedding,
            index,
            min_score,
        }
    }

    /// Retrieve up to `top_k` passages for `query`, sorted by descending
    /// score with ties in index insertion order.
    ///
    /// An empty index (or a floor that filters everything) is an empty
    /// result, not an error. Embedding failures propagate so the caller can
    /// decide whether to degrade.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Err(FitragError::Config(
                "top_k must be a positive integer".to_string(),
            ));
        }

        debug!("Retrieving top {top_k} passages for query: {query}");
        let query_vector = self.embedding.embed(query).await?;
        let matches = self.index.query(&query_vector, top_k).await?;

        let mut results: Vec<RetrievalResult> = matches
            .into_iter()
            .filter(|m| m.score >= self.min_score)
            .map(|m| RetrievalResult {
                source: m
                    .metadata
                    .get("source_name")
                    .cloned()
                    .unwrap_or_else(|| m.id.clone()),
                content: m.text,
                score: m.score,
            })
            .collect();

        // Stable, so equal scores keep the index's insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        debug!("Retrieved {} passages", results.len());
        Ok(results)
    }

    /// Get the configured relevance floor
    #[must_use]
    pub const fn min_score(&self) -> f32 {
        self.min_score
    }
}
