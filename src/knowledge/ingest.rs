//! Knowledge ingestion pipeline: read -> chunk -> embed -> index

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashSet;
use futures::stream;
use futures::stream::StreamExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::FitragError;
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::index::VectorIndex;
use crate::knowledge::is_supported;
use crate::knowledge::reader;
use crate::knowledge::Chunker;
use crate::models::KnowledgeStats;

/// Concurrent embedding requests per document
const EMBED_CONCURRENCY: usize = 8;

/// Outcome of a batch ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
    pub total_chunks: usize,
}

/// Ingestion pipeline over an embedding gateway and a vector index.
///
/// A document is ingested whole or not at all: the first chunk that fails
/// to embed or to index aborts the document. Chunks already written in the
/// same call stay in the index (writes are independent and keyed by
/// deterministic chunk ids, so a successful retry converges).
pub struct KnowledgeBase {
    embedding: Arc<dyn EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
    embedding_model: String,
    documents: DashSet<String>,
}

impl KnowledgeBase {
    /// Create a pipeline from the application config
    pub fn new(
        embedding: Arc<dyn EmbeddingGateway>,
        index: Arc<dyn VectorIndex>,
        config: &AppConfig,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunk_size(), config.chunk_overlap())?;
        Ok(Self {
            embedding,
            index,
            chunker,
            embedding_model: config.embedding_model().to_string(),
            documents: DashSet::new(),
        })
    }

    /// Ingest a single document and return its chunk count.
    ///
    /// `metadata` is attached to every chunk, merged with the chunk's own
    /// `source_name` and `sequence_index`. A `source_name` entry in
    /// `metadata` overrides the file name as the provenance label.
    pub async fn ingest_file(
        &self,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> Result<usize> {
        let source = metadata
            .get("source_name")
            .cloned()
            .unwrap_or_else(|| file_name_of(path));

        info!("Ingesting {} as \"{source}\"", path.display());

        let text = reader::read_document(path)?;
        let chunks = self.chunker.split(&source, &text);
        if chunks.is_empty() {
            return Err(FitragError::Ingestion(format!(
                "document {} produced no chunks",
                path.display()
            )));
        }

        debug!("Embedding {} chunks", chunks.len());
        let embeddings: Vec<Result<Vec<f32>>> =
            stream::iter(chunks.iter().map(|chunk| self.embedding.embed(&chunk.text)))
                .buffered(EMBED_CONCURRENCY)
                .collect()
                .await;

        // First failure aborts the document before any further index writes
        let mut vectors = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            vectors.push(embedding?);
        }

        for (chunk, vector) in chunks.iter().zip(vectors) {
            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert("source_name".to_string(), chunk.source.clone());
            chunk_metadata.insert(
                "sequence_index".to_string(),
                chunk.sequence_index.to_string(),
            );
            self.index
                .upsert(&chunk.id, vector, &chunk.text, chunk_metadata)
                .await?;
        }

        self.documents.insert(source);
        info!("Indexed {} chunks from {}", chunks.len(), path.display());
        Ok(chunks.len())
    }

    /// Ingest every supported document in a directory.
    ///
    /// Per-document failures are logged and counted; they never abort the
    /// rest of the batch.
    pub async fn ingest_dir(
        &self,
        dir: &Path,
        metadata: &HashMap<String, String>,
    ) -> Result<IngestReport> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_supported(path))
            .collect();
        paths.sort();

        info!("Ingesting {} documents from {}", paths.len(), dir.display());

        let mut report = IngestReport::default();
        for path in paths {
            match self.ingest_file(&path, metadata).await {
                Ok(count) => {
                    report.succeeded += 1;
                    report.total_chunks += count;
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Drop the entire knowledge collection
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await?;
        self.documents.clear();
        info!("Knowledge base cleared");
        Ok(())
    }

    /// Knowledge base counters
    pub async fn stats(&self) -> Result<KnowledgeStats> {
        let index_stats = self.index.stats().await?;
        Ok(KnowledgeStats {
            total_documents: self.documents.len(),
            total_chunks: index_stats.count,
            collection_name: index_stats.collection_name,
            embedding_model: self.embedding_model.clone(),
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
