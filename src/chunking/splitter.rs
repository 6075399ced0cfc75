//! Recursive character splitting.
//!
//! Text is cut at the coarsest separator that occurs in it (paragraphs, then lines,
//! then words, then characters). Pieces are greedily packed into chunks of at most
//! `chunk_size` characters, and each new chunk starts with up to `chunk_overlap`
//! characters carried over from the end of the previous one.

use super::Chunk;
use crate::error::{Result, SporError};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::debug;

/// Separators tried in order, coarsest first. The empty separator splits into characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Overlapping, character-bounded transcript splitter.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter, clamping the overlap below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a splitter, rejecting an overlap that is not smaller than the chunk size.
    pub fn try_new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SporError::Config("chunk_size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(SporError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self::new(chunk_size, chunk_overlap))
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into ordered chunks. Blank input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut spans = Vec::new();
        self.split_span(text, 0..text.len(), &self.separators, &mut spans);

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .filter_map(|span| Chunk::from_span(text, span))
            .collect();

        debug!("Split {} characters into {} chunks", text.len(), chunks.len());
        chunks
    }

    fn split_span(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[span.clone()];
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || segment.contains(sep.as_str()))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).map(String::as_str).unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut fitting = Vec::new();
        for piece in pieces(segment, separator, span.start) {
            if char_len(text, &piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                self.merge(text, &fitting, out);
                fitting.clear();
            }
            if finer.is_empty() {
                out.push(piece);
            } else {
                self.split_span(text, piece, finer, out);
            }
        }

        if !fitting.is_empty() {
            self.merge(text, &fitting, out);
        }
    }

    /// Pack adjacent pieces into chunks, carrying the overlap forward.
    fn merge(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size && !window.is_empty() {
                out.push(window_span(&window));

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            out.push(window_span(&window));
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

/// Cut `segment` at each occurrence of `separator`, keeping the separator at the end of
/// its piece. Ranges are offset by `base` into the full text.
fn pieces(segment: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| base + i..base + i + c.len_utf8())
            .collect();
    }

    let mut result = Vec::new();
    let mut last = 0;
    for (idx, matched) in segment.match_indices(separator) {
        let end = idx + matched.len();
        result.push(base + last..base + end);
        last = end;
    }
    if last < segment.len() {
        result.push(base + last..base + segment.len());
    }
    result
}

fn char_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].chars().count()
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map(|(r, _)| r.start).unwrap_or(0);
    let end = window.back().map(|(r, _)| r.end).unwrap_or(start);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::stitch;

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn transcript(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_and_blank_input_yield_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("  \n\n ").is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("  just a short transcript  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a short transcript");
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = transcript(800);
        let splitter = TextSplitter::new(1000, 200);
        let chunks = splitter.split(&text);

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 1000, "chunk too long: {}", chunk.char_len());
            assert_eq!(&text[chunk.start..chunk.end], chunk.text);
        }
        for pair in chunks.windows(2) {
            assert!(pair[1].start < pair[0].end, "consecutive chunks should overlap");
            let shared = pair[0].end - pair[1].start;
            assert!(shared <= 200 + 8, "overlap too large: {}", shared);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let first = "a ".repeat(30);
        let second = "b ".repeat(30);
        let text = format!("{}\n\n{}", first.trim(), second.trim());
        let splitter = TextSplitter::new(70, 10);
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.chars().all(|c| c == 'a' || c == ' '));
        assert!(chunks[1].text.chars().all(|c| c == 'b' || c == ' '));
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(250);
        let splitter = TextSplitter::new(100, 20);
        let chunks = splitter.split(&text);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.char_len() <= 100));
        assert_eq!(stitch(&chunks), text);
    }

    #[test]
    fn test_stitch_reconstructs_transcript() {
        let text = format!(
            "{}\n\nSecond part. {}\n{}",
            transcript(300),
            transcript(150),
            "ünïcödé wörds ".repeat(40)
        );
        let splitter = TextSplitter::new(300, 60);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert_eq!(normalize(&stitch(&chunks)), normalize(&text));
    }

    #[test]
    fn test_try_new_rejects_overlap_not_below_size() {
        assert!(TextSplitter::try_new(100, 100).is_err());
        assert!(TextSplitter::try_new(0, 0).is_err());
        assert!(TextSplitter::try_new(100, 20).is_ok());
    }
}
