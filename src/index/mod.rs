//! Vector index abstraction
//!
//! Stores (vector, text, metadata) tuples keyed by id and answers
//! nearest-neighbor queries. The trait mirrors the contract the retriever
//! and ingestion pipeline depend on; [`MemoryVectorIndex`] is the in-process
//! implementation used by the binary and by tests.

pub mod memory;

pub use memory::MemoryVectorIndex;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::Result;

/// A scored nearest-neighbor match
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    pub text: String,
    /// Similarity normalized to [0, 1]
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Collection-level counters
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub count: usize,
    pub collection_name: String,
}

/// Nearest-neighbor store for embedded chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the entry with the given id
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// Return up to `top_k` entries ranked by similarity to `vector`,
    /// ties resolved by insertion order
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Drop every entry in the collection
    async fn clear(&self) -> Result<()>;

    /// Current entry count and collection name
    async fn stats(&self) -> Result<IndexStats>;
}
