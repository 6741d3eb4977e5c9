//! In-process vector index with optional JSON snapshot persistence

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

use crate::errors::FitragError;
use crate::errors::Result;
use crate::index::IndexMatch;
use crate::index::IndexStats;
use crate::index::VectorIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    text: String,
    metadata: HashMap<String, String>,
}

/// Insertion-ordered in-memory vector index using cosine similarity.
///
/// Entries live in a `Vec` so that equal-score matches rank by insertion
/// order. With a snapshot path configured, every mutation writes the full
/// entry list back to disk, which is plenty for knowledge bases of a few
/// thousand chunks.
pub struct MemoryVectorIndex {
    collection_name: String,
    entries: RwLock<Vec<IndexEntry>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryVectorIndex {
    /// Create an empty, purely in-memory index
    #[must_use]
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            entries: RwLock::new(Vec::new()),
            snapshot_path: None,
        }
    }

    /// Create an index backed by a JSON snapshot file.
    ///
    /// An existing snapshot is loaded; a corrupt one is logged and ignored so
    /// the process can still start with an empty collection.
    pub fn with_path(
        collection_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            match load_snapshot(&path) {
                Ok(entries) => {
                    debug!("Loaded {} index entries from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!("Ignoring unreadable index snapshot {}: {e}", path.display());
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            collection_name: collection_name.into(),
            entries: RwLock::new(entries),
            snapshot_path: Some(path),
        })
    }

    fn persist(&self, entries: &[IndexEntry]) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            let json = serde_json::to_string(entries)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<Vec<IndexEntry>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Cosine similarity mapped from [-1, 1] into [0, 1]; zero-magnitude
/// vectors score 0.0
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Some(first) = entries.first() {
            if first.vector.len() != vector.len() {
                return Err(FitragError::Index(format!(
                    "dimension mismatch: collection holds {}-dim vectors, got {}",
                    first.vector.len(),
                    vector.len()
                )));
            }
        }

        let entry = IndexEntry {
            id: id.to_string(),
            vector,
            text: text.to_string(),
            metadata,
        };

        // Replace in place so re-ingestion keeps the original rank position
        if let Some(pos) = entries.iter().position(|e| e.id == id) {
            entries[pos] = entry;
        } else {
            entries.push(entry);
        }

        self.persist(&entries)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let entries = self.entries.read().await;

        if entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if entries[0].vector.len() != vector.len() {
            return Err(FitragError::Index(format!(
                "dimension mismatch: collection holds {}-dim vectors, query has {}",
                entries[0].vector.len(),
                vector.len()
            )));
        }

        let mut matches: Vec<IndexMatch> = entries
            .iter()
            .map(|e| IndexMatch {
                id: e.id.clone(),
                text: e.text.clone(),
                score: cosine_score(&e.vector, vector),
                metadata: e.metadata.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let entries = self.entries.read().await;
        Ok(IndexStats {
            count: entries.len(),
            collection_name: self.collection_name.clone(),
        })
    }
}
