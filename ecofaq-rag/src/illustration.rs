//! Illustration provider trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A reference to a generated image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ImageRef {
    /// A URL the image can be downloaded from.
    Url(String),
    /// Base64-encoded image bytes.
    Base64(String),
}

/// A service that turns a prompt into an image.
#[async_trait]
pub trait IllustrationProvider: Send + Sync {
    async fn illustrate(&self, prompt: &str) -> Result<ImageRef>;
}

#[async_trait]
impl<P: IllustrationProvider + ?Sized> IllustrationProvider for Arc<P> {
    async fn illustrate(&self, prompt: &str) -> Result<ImageRef> {
        (**self).illustrate(prompt).await
    }
}

/// Returns a fixed placeholder image URL carrying the prompt as a query.
#[derive(Debug, Clone)]
pub struct PlaceholderIllustrator {
    base_url: String,
}

impl PlaceholderIllustrator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

impl Default for PlaceholderIllustrator {
    fn default() -> Self {
        Self::new("https://placehold.co/512x512")
    }
}

#[async_trait]
impl IllustrationProvider for PlaceholderIllustrator {
    async fn illustrate(&self, prompt: &str) -> Result<ImageRef> {
        let text: String =
            prompt.chars().map(|c| if c.is_alphanumeric() { c } else { '+' }).collect();
        Ok(ImageRef::Url(format!("{}?text={text}", self.base_url)))
    }
}
