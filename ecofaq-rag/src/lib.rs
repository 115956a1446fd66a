//! # ecofaq-rag
//!
//! Retrieval-augmented FAQ generation.
//!
//! ## Overview
//!
//! Given a body of text, this crate produces a short list of
//! question/answer pairs by chaining prompts over retrieved context:
//!
//! 1. [`BoundaryChunker`] splits the text at paragraph, line, sentence and
//!    word boundaries.
//! 2. An [`EmbeddingProvider`] embeds every chunk.
//! 3. [`rank`] picks the chunks most similar to the requested topic.
//! 4. [`QuestionGenerator`] asks a [`CompletionProvider`] for N questions.
//! 5. [`AnswerSynthesizer`] answers each question from its own top chunks.
//!
//! [`FaqPipeline`] runs steps 1-5 for plain text. [`FaqService`] adds the
//! Nexus solution catalog, a [`TextSource`] and an [`IllustrationProvider`].
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI embeddings, chat completions and image generation |
//! | `http` | [`HttpTextSource`] for fetching solution pages |
//! | `full` | Everything above |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecofaq_rag::{FaqPipeline, HashEmbeddingProvider, MockCompletionProvider, PipelineRequest};
//!
//! let pipeline = FaqPipeline::builder()
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .completion_provider(Arc::new(MockCompletionProvider::offline()))
//!     .build()?;
//!
//! for pair in pipeline.run(&PipelineRequest::new(article, 3).topic("soil")).await? {
//!     println!("Q: {}\nA: {}", pair.question, pair.answer);
//! }
//! ```

pub mod answer;
pub mod catalog;
pub mod chunking;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod illustration;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod questions;
pub mod ranking;
pub mod retry;
pub mod service;
pub mod source;

pub use answer::AnswerSynthesizer;
pub use catalog::{NEXUS_BASE_URL, NexusSolution};
pub use chunking::{BoundaryChunker, ChunkPolicy, Chunker, LengthUnit};
pub use completion::{CompletionProvider, CompletionRequest};
pub use config::{DuplicatePolicy, FaqConfig, FaqConfigBuilder};
pub use document::{Chunk, ChunkCollection, QaPair, ScoredChunk};
pub use embedding::{EmbeddingCache, EmbeddingProvider, embed_collection};
pub use error::{FaqError, Result, Stage};
pub use extract::extract_article_text;
pub use illustration::{IllustrationProvider, ImageRef, PlaceholderIllustrator};
pub use mock::{HashEmbeddingProvider, MockCompletionProvider};
pub use pipeline::{FaqPipeline, FaqPipelineBuilder, PipelineRequest};
pub use questions::QuestionGenerator;
pub use ranking::{cosine_similarity, join_chunks, rank, rank_by_embedding};
pub use retry::{RetryConfig, Retrying, with_retry};
pub use service::{FaqRequest, FaqResponse, FaqService};
#[cfg(feature = "http")]
pub use source::HttpTextSource;
pub use source::{CachedTextSource, FileTextSource, StaticTextSource, TextSource};
