//! Data types for chunks, ranked results and generated QA pairs.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A contiguous segment of the source text with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Position of the chunk within the source, starting at zero.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Byte range of `text` within the source text.
    pub span: Range<usize>,
    /// The vector embedding for this chunk's text. Empty until embedded.
    pub embedding: Vec<f32>,
}

/// The chunks of one source text, in source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkCollection {
    chunks: Vec<Chunk>,
}

impl ChunkCollection {
    /// Build a collection from chunks that are already in source order.
    ///
    /// Chunks are re-indexed by position so indices are unique and ascending.
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| Chunk { index, ..chunk })
            .collect();
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Mutable access for attaching embeddings.
    pub(crate) fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// Whether every chunk carries an embedding.
    pub fn is_embedded(&self) -> bool {
        self.chunks.iter().all(|c| !c.embedding.is_empty())
    }

    /// The embedding dimension shared by the chunks, if any are embedded.
    pub fn dimensions(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len()).filter(|d| *d > 0)
    }
}

impl<'a> IntoIterator for &'a ChunkCollection {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// A [`Chunk`] paired with its relevance to a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk<'a> {
    /// The retrieved chunk.
    pub chunk: &'a Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}

/// A generated question with its context-grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}
