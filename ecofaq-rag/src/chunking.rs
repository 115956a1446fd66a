//! Source text chunking.
//!
//! This module provides the [`Chunker`] trait and [`BoundaryChunker`], which
//! splits text hierarchically: paragraphs → lines → sentences → words, and
//! only cuts inside a word when a single word is larger than the chunk size.
//! Small segments are then merged back together up to the size bound.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, ChunkCollection};
use crate::error::{FaqError, Result};

/// Rough characters-per-token ratio for English text with BPE tokenizers.
pub const CHARS_PER_TOKEN: usize = 4;

/// Separator levels, coarsest first: paragraph, line, sentence, word. A
/// separator stays attached to the segment it terminates.
static SEPARATOR_LEVELS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\n\n", r"\n", r"[.!?] ", r" "]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("separator pattern is valid"))
        .collect()
});

/// The unit in which chunk sizes are measured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// Estimated model tokens, one per [`CHARS_PER_TOKEN`] characters (rounded up).
    Tokens,
}

impl LengthUnit {
    /// Measure `text` in this unit.
    pub fn measure(&self, text: &str) -> usize {
        self.of_chars(text.chars().count())
    }

    /// Size in this unit of a text that is `chars` characters long.
    fn of_chars(&self, chars: usize) -> usize {
        match self {
            LengthUnit::Chars => chars,
            LengthUnit::Tokens => chars.div_ceil(CHARS_PER_TOKEN),
        }
    }

    /// The number of characters that always fits in `size` units.
    fn chars_in(&self, size: usize) -> usize {
        match self {
            LengthUnit::Chars => size,
            LengthUnit::Tokens => size * CHARS_PER_TOKEN,
        }
    }
}

/// Size bound and overlap used when chunking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Maximum size of a chunk.
    pub max_size: usize,
    /// Maximum size of the text repeated from the end of the previous chunk.
    pub overlap: usize,
    /// Unit of `max_size` and `overlap`.
    pub unit: LengthUnit,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self { max_size: 1000, overlap: 0, unit: LengthUnit::Chars }
    }
}

/// A strategy for splitting source text into chunks.
///
/// Implementations produce chunks in source order with empty embeddings;
/// embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::EmptyInput`] if `text` is empty or whitespace-only.
    fn chunk(&self, text: &str) -> Result<ChunkCollection>;
}

/// Splits text at the coarsest boundary that keeps chunks within the size bound.
///
/// # Example
///
/// ```rust,ignore
/// use ecofaq_rag::{BoundaryChunker, ChunkPolicy, Chunker, LengthUnit};
///
/// let chunker = BoundaryChunker::new(ChunkPolicy { max_size: 200, overlap: 0, unit: LengthUnit::Tokens });
/// let chunks = chunker.chunk(&article)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundaryChunker {
    policy: ChunkPolicy,
}

impl BoundaryChunker {
    /// Create a new `BoundaryChunker` with the given policy.
    pub fn new(policy: ChunkPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ChunkPolicy {
        &self.policy
    }
}

impl Chunker for BoundaryChunker {
    fn chunk(&self, text: &str) -> Result<ChunkCollection> {
        if text.trim().is_empty() {
            return Err(FaqError::EmptyInput);
        }
        if self.policy.max_size == 0 {
            return Err(FaqError::InvalidArgument("chunk size must be greater than zero".into()));
        }

        let mut segments = Vec::new();
        segment(text, 0, &SEPARATOR_LEVELS, &self.policy, &mut segments);

        let chunks = merge_segments(text, &segments, &self.policy)
            .into_iter()
            .filter_map(|span| trim_span(text, span))
            .map(|span| Chunk {
                index: 0,
                text: text[span.clone()].to_string(),
                span,
                embedding: Vec::new(),
            })
            .collect();

        Ok(ChunkCollection::new(chunks))
    }
}

/// Recursively split `text` into contiguous byte ranges that each fit the
/// size bound, preferring coarser separators.
fn segment(
    text: &str,
    offset: usize,
    levels: &[Regex],
    policy: &ChunkPolicy,
    out: &mut Vec<Range<usize>>,
) {
    if text.is_empty() {
        return;
    }
    if policy.unit.measure(text) <= policy.max_size {
        out.push(offset..offset + text.len());
        return;
    }

    let Some((separator, remaining)) = levels.split_first() else {
        hard_cut(text, offset, policy, out);
        return;
    };

    for piece in split_keeping_separators(text, separator) {
        segment(&text[piece.clone()], offset + piece.start, remaining, policy, out);
    }
}

/// Split at every match of `separator`, keeping the separator attached to
/// the preceding piece.
fn split_keeping_separators(text: &str, separator: &Regex) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for found in separator.find_iter(text) {
        pieces.push(start..found.end());
        start = found.end();
    }

    if start < text.len() {
        pieces.push(start..text.len());
    }

    pieces
}

/// Cut a single oversized word at character boundaries.
fn hard_cut(text: &str, offset: usize, policy: &ChunkPolicy, out: &mut Vec<Range<usize>>) {
    let limit = policy.unit.chars_in(policy.max_size).max(1);
    let mut start = 0;
    let mut count = 0;

    for (pos, _) in text.char_indices() {
        if count == limit {
            out.push(offset + start..offset + pos);
            start = pos;
            count = 0;
        }
        count += 1;
    }
    out.push(offset + start..offset + text.len());
}

/// Greedily merge contiguous segments into chunk spans within the size bound.
///
/// `segments` must be contiguous, which lets sizes come from a running
/// character count instead of re-measuring each candidate span.
fn merge_segments(text: &str, segments: &[Range<usize>], policy: &ChunkPolicy) -> Vec<Range<usize>> {
    let mut prefix = Vec::with_capacity(segments.len() + 1);
    prefix.push(0);
    for segment in segments {
        let total = prefix[prefix.len() - 1] + text[segment.clone()].chars().count();
        prefix.push(total);
    }
    // Segments `from..=to` fit in `limit` units.
    let fits = |from: usize, to: usize, limit: usize| {
        policy.unit.of_chars(prefix[to + 1] - prefix[from]) <= limit
    };

    let mut spans = Vec::new();
    let mut start = 0;

    while start < segments.len() {
        let mut end = start + 1;
        while end < segments.len() && fits(start, end, policy.max_size) {
            end += 1;
        }
        spans.push(segments[start].start..segments[end - 1].end);

        if end == segments.len() {
            break;
        }

        // Step back over whole trailing segments while they fit in the overlap
        // and the next chunk can still take at least one new segment.
        let mut next = end;
        while policy.overlap > 0
            && next > start + 1
            && fits(next - 1, end - 1, policy.overlap)
            && fits(next - 1, end, policy.max_size)
        {
            next -= 1;
        }
        start = next;
    }

    spans
}

/// Shrink a span to exclude surrounding whitespace; `None` if nothing remains.
fn trim_span(text: &str, span: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[span.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = slice.len() - slice.trim_start().len();
    let start = span.start + lead;
    Some(start..start + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_size: usize, overlap: usize) -> BoundaryChunker {
        BoundaryChunker::new(ChunkPolicy { max_size, overlap, unit: LengthUnit::Chars })
    }

    fn texts(collection: &ChunkCollection) -> Vec<&str> {
        collection.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_and_blank_input_fail() {
        assert!(matches!(chunker(10, 0).chunk(""), Err(FaqError::EmptyInput)));
        assert!(matches!(chunker(10, 0).chunk("  \n\t "), Err(FaqError::EmptyInput)));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunker(100, 0).chunk("  Trees store carbon.  ").unwrap();
        assert_eq!(texts(&chunks), vec!["Trees store carbon."]);
        assert_eq!(chunks.get(0).unwrap().span, 2..21);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = chunker(30, 0).chunk(text).unwrap();
        assert_eq!(texts(&chunks), vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn falls_back_to_sentences_then_words() {
        let text = "Shade trees cool crops. Roots hold soil in place during heavy rain.";
        let chunks = chunker(25, 0).chunk(text).unwrap();
        assert_eq!(chunks.get(0).unwrap().text, "Shade trees cool crops.");
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 25);
            assert!(!chunk.text.starts_with(' '));
        }
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn hard_cuts_only_oversized_words() {
        let chunks = chunker(4, 0).chunk("ab silvopasture").unwrap();
        assert_eq!(texts(&chunks), vec!["ab", "silv", "opas", "ture"]);
    }

    #[test]
    fn hard_cut_respects_multibyte_characters() {
        let chunks = chunker(2, 0).chunk("ééé").unwrap();
        assert_eq!(texts(&chunks), vec!["éé", "é"]);
    }

    #[test]
    fn overlap_repeats_trailing_segments() {
        let chunks = chunker(12, 6).chunk("one two three four five").unwrap();
        assert_eq!(texts(&chunks), vec!["one two", "two three", "three four", "four five"]);
    }

    #[test]
    fn token_unit_scales_the_bound() {
        let text = "aaaa bbbb cccc dddd";
        let by_tokens =
            BoundaryChunker::new(ChunkPolicy { max_size: 3, overlap: 0, unit: LengthUnit::Tokens })
                .chunk(text)
                .unwrap();
        assert_eq!(texts(&by_tokens), vec!["aaaa bbbb", "cccc dddd"]);
        assert_eq!(LengthUnit::Tokens.measure("abcde"), 2);
    }

    #[test]
    fn split_keeps_separators_attached() {
        let text = "Why? Because. Yes! ok";
        let pieces: Vec<&str> = split_keeping_separators(text, &SEPARATOR_LEVELS[2])
            .into_iter()
            .map(|r| &text[r])
            .collect();
        assert_eq!(pieces, vec!["Why? ", "Because. ", "Yes! ", "ok"]);
    }

    #[test]
    fn large_single_paragraph_chunks_in_linear_time() {
        let sentence = "Silvopasture combines trees, forage and grazing livestock on one plot. ";
        let text = sentence.repeat(10_000);

        let started = std::time::Instant::now();
        let chunks = chunker(1000, 100).chunk(&text).unwrap();
        let elapsed = started.elapsed();

        assert!(chunks.len() > 500);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 1000));
        assert!(elapsed < std::time::Duration::from_secs(5), "chunking took {elapsed:?}");
    }
}
