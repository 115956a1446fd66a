//! Text acquisition collaborators.
//!
//! The pipeline only ever sees plain text. A [`TextSource`] turns a URL (or
//! any other locator) into that text, and `HttpTextSource` strips HTML pages
//! down to their article; [`CachedTextSource`] memoises fetches
//! with an explicit capacity and least-recently-used eviction.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FaqError, Result};

/// Provides the raw text behind a URL.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch the text for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::Fetch`] if the text cannot be obtained.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Reads text from local files. The "url" is a path relative to `root`.
#[derive(Debug, Clone, Default)]
pub struct FileTextSource {
    root: PathBuf,
}

impl FileTextSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let path = self.root.join(url);
        tokio::fs::read_to_string(&path).await.map_err(|e| FaqError::Fetch {
            url: url.to_string(),
            message: format!("cannot read {}: {e}", path.display()),
        })
    }
}

/// Serves text from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticTextSource {
    pages: HashMap<String, String>,
}

impl StaticTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.insert(url.into(), text.into());
        self
    }
}

#[async_trait]
impl TextSource for StaticTextSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| FaqError::Fetch {
            url: url.to_string(),
            message: "no such page".to_string(),
        })
    }
}

/// Bounded LRU map from URL to fetched text.
#[derive(Debug)]
struct LruCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl LruCache {
    fn get(&mut self, key: &str) -> Option<String> {
        let value = self.entries.get(key)?.clone();
        self.touch(key);
        Some(value)
    }

    fn insert(&mut self, key: String, value: String) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                debug!(url = %evicted, "evicting cached text");
                self.entries.remove(&evicted);
            }
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// A [`TextSource`] wrapper that caches successful fetches by URL.
///
/// Failures are not cached. The cache lives as long as this value; share it
/// explicitly (e.g. behind an `Arc`) to reuse fetches across requests.
#[derive(Debug)]
pub struct CachedTextSource<S> {
    inner: S,
    cache: Mutex<LruCache>,
}

impl<S: TextSource> CachedTextSource<S> {
    /// Wrap `inner`, keeping at most `capacity` pages (minimum one).
    pub fn new(inner: S, capacity: usize) -> Self {
        let cache = LruCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        };
        Self { inner, cache: Mutex::new(cache) }
    }

    /// Number of cached pages.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.entries.len()
    }

    /// Whether `url` is currently cached.
    pub async fn contains(&self, url: &str) -> bool {
        self.cache.lock().await.entries.contains_key(url)
    }
}

#[async_trait]
impl<S: TextSource> TextSource for CachedTextSource<S> {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        if let Some(text) = self.cache.lock().await.get(url) {
            debug!(url, "text cache hit");
            return Ok(text);
        }

        info!(url, "fetching source text");
        let text = self.inner.fetch_text(url).await?;
        self.cache.lock().await.insert(url.to_string(), text.clone());
        Ok(text)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTextSource;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::{debug, error};

    use super::TextSource;
    use crate::error::{FaqError, Result};
    use crate::extract::extract_article_text;

    /// Fetches a URL and returns its readable text.
    ///
    /// HTML responses are reduced to their article text with
    /// [`extract_article_text`]; other bodies are returned as-is.
    #[derive(Debug, Clone)]
    pub struct HttpTextSource {
        client: reqwest::Client,
    }

    impl HttpTextSource {
        pub fn new() -> Result<Self> {
            Self::with_timeout(Duration::from_secs(30))
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| FaqError::Config(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl TextSource for HttpTextSource {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            let fetch_error = |message: String| FaqError::Fetch { url: url.to_string(), message };

            let response = self.client.get(url).send().await.map_err(|e| {
                error!(url, error = %e, "fetch failed");
                fetch_error(format!("request failed: {e}"))
            })?;

            let status = response.status();
            if !status.is_success() {
                error!(url, %status, "fetch returned error status");
                return Err(fetch_error(format!("server returned {status}")));
            }

            let is_html = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("html"));
            let body =
                response.text().await.map_err(|e| fetch_error(format!("failed to read body: {e}")))?;
            if !is_html {
                return Ok(body);
            }

            let text = extract_article_text(&body)
                .ok_or_else(|| fetch_error("page has no readable text".to_string()))?;
            debug!(url, html_len = body.len(), text_len = text.len(), "extracted article text");
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextSource for CountingSource {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("missing") {
                return Err(FaqError::Fetch { url: url.into(), message: "404".into() });
            }
            Ok(format!("text of {url}"))
        }
    }

    fn counting() -> CountingSource {
        CountingSource { calls: AtomicUsize::new(0) }
    }

    #[tokio::test]
    async fn repeated_fetches_hit_the_cache() {
        let source = CachedTextSource::new(counting(), 4);
        assert_eq!(source.fetch_text("a").await.unwrap(), "text of a");
        assert_eq!(source.fetch_text("a").await.unwrap(), "text of a");
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let source = CachedTextSource::new(counting(), 2);
        source.fetch_text("a").await.unwrap();
        source.fetch_text("b").await.unwrap();
        source.fetch_text("a").await.unwrap();
        source.fetch_text("c").await.unwrap();

        assert!(source.contains("a").await);
        assert!(!source.contains("b").await);
        assert!(source.contains("c").await);
        assert_eq!(source.len().await, 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = CachedTextSource::new(counting(), 2);
        assert!(matches!(source.fetch_text("missing").await, Err(FaqError::Fetch { .. })));
        assert!(source.fetch_text("missing").await.is_err());
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.len().await, 0);
    }

    #[tokio::test]
    async fn static_source_reports_unknown_pages() {
        let source = StaticTextSource::new().with_page("x", "hello");
        assert_eq!(source.fetch_text("x").await.unwrap(), "hello");
        assert!(matches!(source.fetch_text("y").await, Err(FaqError::Fetch { .. })));
    }

    #[tokio::test]
    async fn file_source_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wind.txt"), "Wind turbines").unwrap();

        let source = FileTextSource::new(dir.path());
        assert_eq!(source.fetch_text("wind.txt").await.unwrap(), "Wind turbines");
        assert!(matches!(source.fetch_text("solar.txt").await, Err(FaqError::Fetch { .. })));
    }
}
