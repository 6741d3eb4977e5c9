//! Knowledge base ingestion
//!
//! Turns raw documents into searchable chunks: read and extract text by
//! file type, split into overlapping chunks, embed each chunk, and write
//! (vector, text, metadata) tuples into the vector index.

pub mod chunker;
pub mod ingest;
pub mod reader;

pub use chunker::Chunker;
pub use ingest::IngestReport;
pub use ingest::KnowledgeBase;
pub use reader::read_document;

/// File extensions the ingestion pipeline accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

/// Whether a path carries a supported knowledge-document extension
#[must_use]
pub fn is_supported(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}
