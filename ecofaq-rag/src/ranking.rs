//! Cosine-similarity ranking of chunks against a query.

use tracing::debug;

use crate::document::{ChunkCollection, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{FaqError, Result};

/// Delimiter placed between chunks when they are joined into one context.
pub const CONTEXT_DELIMITER: &str = "\n\n";

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank the chunks of `collection` against an already-embedded query.
///
/// Returns at most `min(top_k, collection.len())` results, ordered by
/// descending score; equal scores keep source order.
///
/// # Errors
///
/// - [`FaqError::InvalidArgument`] if `top_k == 0`, the collection is empty,
///   or a chunk has no embedding.
/// - [`FaqError::DimensionMismatch`] if the query and chunk dimensions differ.
pub fn rank_by_embedding<'a>(
    collection: &'a ChunkCollection,
    query: &[f32],
    top_k: usize,
) -> Result<Vec<ScoredChunk<'a>>> {
    if top_k == 0 {
        return Err(FaqError::InvalidArgument("top_k must be at least 1".to_string()));
    }
    if collection.is_empty() {
        return Err(FaqError::InvalidArgument("cannot rank an empty chunk collection".to_string()));
    }
    if !collection.is_embedded() {
        return Err(FaqError::InvalidArgument(
            "every chunk must be embedded before ranking".to_string(),
        ));
    }
    if let Some(chunk) = collection.iter().find(|c| c.embedding.len() != query.len()) {
        return Err(FaqError::DimensionMismatch {
            expected: chunk.embedding.len(),
            actual: query.len(),
        });
    }

    let mut scored: Vec<ScoredChunk<'a>> = collection
        .iter()
        .map(|chunk| ScoredChunk { chunk, score: cosine_similarity(&chunk.embedding, query) })
        .collect();

    scored.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
    scored.truncate(top_k);
    Ok(scored)
}

/// Embed `query` and rank the chunks of `collection` against it.
///
/// # Errors
///
/// Argument errors are raised before the query is embedded; embedding
/// errors propagate unchanged. See [`rank_by_embedding`].
pub async fn rank<'a>(
    collection: &'a ChunkCollection,
    query: &str,
    top_k: usize,
    provider: &dyn EmbeddingProvider,
) -> Result<Vec<ScoredChunk<'a>>> {
    if top_k == 0 {
        return Err(FaqError::InvalidArgument("top_k must be at least 1".to_string()));
    }
    if collection.is_empty() {
        return Err(FaqError::InvalidArgument("cannot rank an empty chunk collection".to_string()));
    }

    let query_embedding = provider.embed(query).await?;
    let results = rank_by_embedding(collection, &query_embedding, top_k)?;

    debug!(
        query_len = query.len(),
        top_k,
        result_count = results.len(),
        best_score = results.first().map(|r| r.score),
        "ranked chunks"
    );
    Ok(results)
}

/// Join ranked chunks into a single context string.
///
/// Chunks are emitted in source order rather than rank order, separated by
/// [`CONTEXT_DELIMITER`].
pub fn join_chunks(results: &[ScoredChunk<'_>]) -> String {
    let mut chunks: Vec<_> = results.iter().map(|r| r.chunk).collect();
    chunks.sort_by_key(|c| c.index);
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(CONTEXT_DELIMITER)
}
