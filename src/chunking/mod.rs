//! Transcript chunking for embedding and retrieval.
//!
//! Transcripts are split into overlapping character-bounded chunks so that a thought
//! cut at one chunk boundary is still whole in the neighbouring chunk.

mod splitter;

pub use splitter::{TextSplitter, DEFAULT_SEPARATORS};

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A chunk of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk (whitespace-trimmed).
    pub text: String,
    /// Byte offset of `text` in the source transcript.
    pub start: usize,
    /// Byte offset one past the end of `text` in the source transcript.
    pub end: usize,
}

impl Chunk {
    /// Build a chunk from a span of `source`, trimming surrounding whitespace.
    ///
    /// Returns `None` when the span is blank.
    pub(crate) fn from_span(source: &str, span: Range<usize>) -> Option<Self> {
        let raw = &source[span.clone()];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let start = span.start + (raw.len() - raw.trim_start().len());
        Some(Self {
            text: trimmed.to_string(),
            start,
            end: start + trimmed.len(),
        })
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Reassemble a transcript from its chunks, keeping only each chunk's non-overlapping tail.
///
/// Whitespace dropped at chunk edges comes back as a single space.
pub fn stitch(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered: Option<usize> = None;

    for chunk in chunks {
        match covered {
            None => out.push_str(&chunk.text),
            Some(end) if chunk.start >= end => {
                if chunk.start > end {
                    out.push(' ');
                }
                out.push_str(&chunk.text);
            }
            Some(end) if chunk.end > end => out.push_str(&chunk.text[end - chunk.start..]),
            Some(_) => {}
        }
        covered = Some(covered.map_or(chunk.end, |end| end.max(chunk.end)));
    }

    out
}
