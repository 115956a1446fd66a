//! Bounded retry with linear backoff around external service calls.
//!
//! [`Retrying`] wraps any embedding, completion or illustration provider and
//! retries only transient failures ([`FaqError::is_transient`]). Everything
//! else, including malformed generation output, is returned immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::illustration::{IllustrationProvider, ImageRef};

/// Retry limits for one wrapped provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; the n-th retry waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, backoff: Duration::from_millis(500) }
    }
}

/// Run `op` until it succeeds, fails permanently, or retries are exhausted.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let backoff = config.backoff * attempt;
            debug!(operation, attempt, backoff_ms = backoff.as_millis() as u64, "retrying");
            tokio::time::sleep(backoff).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                warn!(operation, attempt, error = %e, "transient failure");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A provider wrapper that retries transient failures.
///
/// # Example
///
/// ```rust,ignore
/// use ecofaq_rag::{Retrying, RetryConfig};
///
/// let embedder = Retrying::new(OpenAIEmbeddingProvider::from_env()?, RetryConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct Retrying<P> {
    inner: P,
    config: RetryConfig,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for Retrying<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        with_retry(&self.config, "embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        with_retry(&self.config, "embed_batch", || self.inner.embed_batch(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for Retrying<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        with_retry(&self.config, "complete", || self.inner.complete(request.clone())).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: IllustrationProvider> IllustrationProvider for Retrying<P> {
    async fn illustrate(&self, prompt: &str) -> Result<ImageRef> {
        with_retry(&self.config, "illustrate", || self.inner.illustrate(prompt)).await
    }
}
