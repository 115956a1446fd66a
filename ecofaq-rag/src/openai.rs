//! OpenAI providers for embeddings, chat completions and image generation.
//!
//! This module is only available when the `openai` feature is enabled.
//!
//! All three providers call the REST API directly with `reqwest` and map
//! HTTP failures onto [`FaqError`] the same way:
//!
//! | Response | Error |
//! |----------|-------|
//! | transport failure, 5xx | [`FaqError::ServiceUnavailable`] |
//! | 429 | [`FaqError::RateLimited`] |
//! | 401, 403 | [`FaqError::Authentication`] |
//! | other 4xx | [`FaqError::InvalidRequest`] |
//!
//! A 400 whose error code is `content_policy_violation` maps to
//! [`FaqError::ContentPolicy`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::embedding::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::illustration::{IllustrationProvider, ImageRef};

/// The default OpenAI API root.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model for questions and answers.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// The default image model.
const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";

/// The default image size.
const DEFAULT_IMAGE_SIZE: &str = "512x512";

const SERVICE: &str = "OpenAI";

// ── Shared HTTP plumbing ───────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success HTTP status and its body to a [`FaqError`].
pub(crate) fn status_error(status: StatusCode, body: &str) -> FaqError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.error.code.clone());
    let detail = parsed.map(|e| e.error.message).unwrap_or_else(|| body.to_string());

    let service = SERVICE.to_string();
    let message = format!("API returned {status}: {detail}");
    match status.as_u16() {
        429 => FaqError::RateLimited { service, message },
        401 | 403 => FaqError::Authentication { service, message },
        500..=599 => FaqError::ServiceUnavailable { service, message },
        _ if code.as_deref() == Some("content_policy_violation") => {
            FaqError::ContentPolicy { service, message }
        }
        _ => FaqError::InvalidRequest { service, message },
    }
}

/// Connection settings shared by the three providers.
#[derive(Clone)]
struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(FaqError::Config("OpenAI API key must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: OPENAI_API_BASE.into() })
    }

    fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            FaqError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(body).send().await.map_err(
                |e| {
                    error!(provider = SERVICE, path, error = %e, "request failed");
                    FaqError::ServiceUnavailable {
                        service: SERVICE.into(),
                        message: format!("request failed: {e}"),
                    }
                },
            )?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = SERVICE, path, %status, "API error");
            return Err(status_error(status, &body));
        }

        response.json().await.map_err(|e| {
            error!(provider = SERVICE, path, error = %e, "failed to parse response");
            FaqError::ServiceUnavailable {
                service: SERVICE.into(),
                message: format!("failed to parse response: {e}"),
            }
        })
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use ecofaq_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_dimensions(512);
/// let embedding = provider.embed("mangrove restoration").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: OpenAIClient,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses `text-embedding-3-small` with 1536 dimensions.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(OpenAIClient::new(api_key.into())?))
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_client(OpenAIClient::from_env()?))
    }

    fn with_client(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        }
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Point the provider at an OpenAI-compatible API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = SERVICE, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| FaqError::ServiceUnavailable {
            service: SERVICE.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = SERVICE, batch_size = texts.len(), model = %self.model, "embedding batch");

        let body =
            EmbeddingRequest { model: &self.model, input: texts, dimensions: self.request_dimensions };
        let mut response: EmbeddingResponse = self.client.post("embeddings", &body).await?;

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`CompletionProvider`] backed by the OpenAI chat completions API.
///
/// Each prompt is sent as a single user message.
pub struct OpenAICompletionProvider {
    client: OpenAIClient,
    model: String,
}

impl OpenAICompletionProvider {
    /// Create a new provider using `gpt-4o-mini`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self { client: OpenAIClient::new(api_key.into())?, model: DEFAULT_CHAT_MODEL.into() })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self { client: OpenAIClient::from_env()?, model: DEFAULT_CHAT_MODEL.into() })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Extract the generated text from the first choice.
fn chat_text(response: ChatResponse) -> Result<String> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        FaqError::GenerationParse("completion returned no choices".to_string())
    })?;

    if let Some(refusal) = choice.message.refusal {
        return Err(FaqError::ContentPolicy { service: SERVICE.into(), message: refusal });
    }
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(FaqError::ContentPolicy {
            service: SERVICE.into(),
            message: "output was filtered".into(),
        });
    }
    choice
        .message
        .content
        .ok_or_else(|| FaqError::GenerationParse("completion returned no content".to_string()))
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        debug!(
            provider = SERVICE,
            model = %self.model,
            prompt_len = request.prompt.len(),
            max_tokens = request.max_tokens,
            "requesting completion"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: &request.prompt }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let response: ChatResponse = self.client.post("chat/completions", &body).await?;
        chat_text(response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ── Images ─────────────────────────────────────────────────────────

/// An [`IllustrationProvider`] backed by the OpenAI image generation API.
pub struct OpenAIImageProvider {
    client: OpenAIClient,
    model: String,
    size: String,
}

impl OpenAIImageProvider {
    /// Create a new provider generating one 512x512 image per prompt.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(OpenAIClient::new(api_key.into())?))
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_client(OpenAIClient::from_env()?))
    }

    fn with_client(client: OpenAIClient) -> Self {
        Self { client, model: DEFAULT_IMAGE_MODEL.into(), size: DEFAULT_IMAGE_SIZE.into() }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the image size, e.g. `1024x1024`.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

fn image_ref(response: ImageResponse) -> Result<ImageRef> {
    let image = response.data.into_iter().next().ok_or_else(|| {
        FaqError::GenerationParse("image generation returned no images".to_string())
    })?;
    match (image.url, image.b64_json) {
        (Some(url), _) => Ok(ImageRef::Url(url)),
        (None, Some(data)) => Ok(ImageRef::Base64(data)),
        (None, None) => Err(FaqError::GenerationParse("image has neither url nor data".into())),
    }
}

#[async_trait]
impl IllustrationProvider for OpenAIImageProvider {
    async fn illustrate(&self, prompt: &str) -> Result<ImageRef> {
        debug!(provider = SERVICE, model = %self.model, size = %self.size, "generating image");

        let body = ImageRequest { model: &self.model, prompt, n: 1, size: &self.size };
        let response: ImageResponse = self.client.post("images/generations", &body).await?;
        image_ref(response)
    }
}
