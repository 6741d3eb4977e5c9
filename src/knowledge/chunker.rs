//! Overlapping text chunker
//!
//! Splits document text into chunks bounded by a character budget, with a
//! fixed overlap duplicated between consecutive chunks so context survives
//! the cut. Splits prefer paragraph breaks, then sentence ends, then
//! whitespace, before falling back to a hard cut. All positions are char
//! positions, never byte offsets, so multi-byte text splits cleanly.

use sha2::Digest;
use sha2::Sha256;

use crate::errors::FitragError;
use crate::errors::Result;
use crate::models::Chunk;

/// A break candidate may not retreat past half the window, otherwise long
/// boundary-free stretches would degenerate into tiny chunks
const MIN_WINDOW_FRACTION: usize = 2;

/// Deterministic overlapping splitter
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker; `overlap` must be smaller than `max_chunk_size`
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(FitragError::Config(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= max_chunk_size {
            return Err(FitragError::Config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({max_chunk_size})"
            )));
        }
        Ok(Self {
            max_chunk_size,
            overlap,
        })
    }

    /// Get the chunk size bound in characters
    #[must_use]
    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Get the overlap in characters
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered chunks attributed to `source`.
    ///
    /// Identical input and parameters always produce the identical chunk
    /// sequence, ids included. Whitespace-only input yields no chunks; an
    /// emitted chunk is never empty.
    #[must_use]
    pub fn split(&self, source: &str, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        // Byte offset of each char position, plus the end sentinel
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());

        let n = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut sequence = 0usize;

        while start < n {
            let hard_end = (start + self.max_chunk_size).min(n);
            let end = if hard_end < n {
                find_break(&chars, start, hard_end, self.max_chunk_size)
            } else {
                hard_end
            };

            let piece = &text[offsets[start]..offsets[end]];
            if !piece.trim().is_empty() {
                chunks.push(make_chunk(source, sequence, piece));
                sequence += 1;
            }

            if end >= n {
                break;
            }
            // Overlap is measured back from the emitted end; the max() guard
            // keeps forward progress even for degenerate windows
            start = (end.saturating_sub(self.overlap)).max(start + 1);
        }

        chunks
    }
}

/// Pick the best break position in `(start, limit]`, preferring paragraph,
/// then sentence, then whitespace boundaries, falling back to `limit`
fn find_break(chars: &[char], start: usize, limit: usize, window: usize) -> usize {
    let floor = start + (window / MIN_WINDOW_FRACTION).max(1);
    let floor = floor.min(limit);

    let mut sentence_break = None;
    let mut whitespace_break = None;

    let mut pos = limit;
    while pos > floor {
        let prev = chars[pos - 1];
        if prev == '\n' && pos >= 2 && chars[pos - 2] == '\n' {
            return pos; // paragraph break wins outright
        }
        if sentence_break.is_none() && is_sentence_end(prev, chars.get(pos).copied()) {
            sentence_break = Some(pos);
        }
        if whitespace_break.is_none() && prev.is_whitespace() {
            whitespace_break = Some(pos);
        }
        pos -= 1;
    }

    sentence_break.or(whitespace_break).unwrap_or(limit)
}

/// Sentence enders: CJK full stops terminate on their own; ASCII ones only
/// when followed by whitespace, so "1.5" or "e.g." stay intact
fn is_sentence_end(c: char, next: Option<char>) -> bool {
    match c {
        '。' | '！' | '？' => true,
        '.' | '!' | '?' => next.is_some_and(char::is_whitespace),
        _ => false,
    }
}

fn make_chunk(source: &str, sequence_index: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0]);
    hasher.update(sequence_index.to_le_bytes());
    hasher.update([0]);
    hasher.update(text.as_bytes());
    let id = format!("{:x}", hasher.finalize());

    Chunk {
        id,
        text: text.to_string(),
        source: source.to_string(),
        sequence_index,
        metadata: std::collections::HashMap::new(),
    }
}
