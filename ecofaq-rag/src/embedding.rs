//! Embedding provider trait for generating vector embeddings from text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::document::ChunkCollection;
use crate::error::{FaqError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use ecofaq_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, one per input
    /// and in the same order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

/// Embed every chunk of `collection` with a single batch call.
///
/// # Errors
///
/// Propagates provider errors unchanged. Returns
/// [`FaqError::DimensionMismatch`] if the provider returns the wrong number
/// of vectors or vectors of differing dimension.
pub async fn embed_collection(
    provider: &dyn EmbeddingProvider,
    collection: &mut ChunkCollection,
) -> Result<()> {
    if collection.is_empty() {
        return Ok(());
    }

    let texts: Vec<&str> = collection.iter().map(|c| c.text.as_str()).collect();
    let embeddings = provider.embed_batch(&texts).await?;

    if embeddings.len() != collection.len() {
        return Err(FaqError::DimensionMismatch {
            expected: collection.len(),
            actual: embeddings.len(),
        });
    }

    let dimensions = embeddings[0].len();
    if dimensions == 0 {
        return Err(FaqError::DimensionMismatch { expected: provider.dimensions(), actual: 0 });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(FaqError::DimensionMismatch { expected: dimensions, actual: bad.len() });
    }

    for (chunk, embedding) in collection.chunks_mut().iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    debug!(chunk_count = collection.len(), dimensions, "embedded chunk collection");
    Ok(())
}

/// A request-scoped memo over an [`EmbeddingProvider`].
///
/// Identical texts are embedded once, so every lookup of the same text within
/// a run yields the identical vector. Create one per pipeline run; it is not
/// meant to outlive a request.
pub struct EmbeddingCache<'a> {
    inner: &'a dyn EmbeddingProvider,
    memo: Mutex<HashMap<String, Vec<f32>>>,
}

impl<'a> EmbeddingCache<'a> {
    pub fn new(inner: &'a dyn EmbeddingProvider) -> Self {
        Self { inner, memo: Mutex::new(HashMap::new()) }
    }

    /// Number of distinct texts embedded so far.
    pub async fn len(&self) -> usize {
        self.memo.lock().await.len()
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingCache<'_> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.memo.lock().await.get(text) {
            return Ok(hit.clone());
        }
        // The lock is not held across the provider call; concurrent misses for
        // the same text may both call out, and the first insert wins.
        let embedding = self.inner.embed(text).await?;
        let mut memo = self.memo.lock().await;
        Ok(memo.entry(text.to_string()).or_insert(embedding).clone())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let missing: Vec<&str> = {
            let memo = self.memo.lock().await;
            let mut seen = std::collections::HashSet::new();
            texts.iter().copied().filter(|t| !memo.contains_key(*t) && seen.insert(*t)).collect()
        };

        if !missing.is_empty() {
            let fetched = self.inner.embed_batch(&missing).await?;
            if fetched.len() != missing.len() {
                return Err(FaqError::DimensionMismatch {
                    expected: missing.len(),
                    actual: fetched.len(),
                });
            }
            let mut memo = self.memo.lock().await;
            for (text, embedding) in missing.into_iter().zip(fetched) {
                memo.entry(text.to_string()).or_insert(embedding);
            }
        }

        let memo = self.memo.lock().await;
        Ok(texts.iter().map(|t| memo.get(*t).cloned().unwrap_or_default()).collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
