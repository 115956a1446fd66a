//! FAQ pipeline orchestrator.
//!
//! The [`FaqPipeline`] runs the full prompt chain for one source text:
//! chunk → embed → rank against the topic → generate questions → answer each
//! question from freshly retrieved context.
//!
//! # Example
//!
//! ```rust,ignore
//! use ecofaq_rag::{FaqConfig, FaqPipeline, PipelineRequest};
//!
//! let pipeline = FaqPipeline::builder()
//!     .config(FaqConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .completion_provider(Arc::new(llm))
//!     .build()?;
//!
//! let pairs = pipeline
//!     .run(&PipelineRequest::new(article, 3).topic("carbon sequestration").audience("students"))
//!     .await?;
//! ```

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::answer::AnswerSynthesizer;
use crate::chunking::{BoundaryChunker, Chunker};
use crate::completion::CompletionProvider;
use crate::config::FaqConfig;
use crate::document::{ChunkCollection, QaPair, ScoredChunk};
use crate::embedding::{EmbeddingCache, EmbeddingProvider, embed_collection};
use crate::error::{FaqError, Result, Stage};
use crate::questions::{QuestionGenerator, validate_question_count};
use crate::ranking::{join_chunks, rank, rank_by_embedding};

/// The input of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineRequest {
    /// Plain source text.
    pub source_text: String,
    /// Topic the questions should focus on; empty for no focus.
    #[serde(default)]
    pub topic: String,
    /// Intended readers; empty for a general audience.
    #[serde(default)]
    pub audience: String,
    /// Number of QA pairs to produce, 2 to 5.
    pub num_questions: usize,
}

impl PipelineRequest {
    pub fn new(source_text: impl Into<String>, num_questions: usize) -> Self {
        Self {
            source_text: source_text.into(),
            topic: String::new(),
            audience: String::new(),
            num_questions,
        }
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

/// The FAQ pipeline orchestrator.
///
/// Stateless between runs: every call to [`run`](FaqPipeline::run) builds
/// its own chunk collection and embedding memo. Construct one via
/// [`FaqPipeline::builder()`].
pub struct FaqPipeline {
    config: FaqConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    completion_provider: Arc<dyn CompletionProvider>,
    chunker: Arc<dyn Chunker>,
}

impl FaqPipeline {
    /// Create a new [`FaqPipelineBuilder`].
    pub fn builder() -> FaqPipelineBuilder {
        FaqPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &FaqConfig {
        &self.config
    }

    /// Generate `num_questions` QA pairs from the request's source text.
    ///
    /// The question count and the source text are validated before any
    /// service call. Answers are generated with up to
    /// `answer_concurrency` calls in flight; the first failure aborts the
    /// run and drops the answers still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::Stage`] naming the failed stage, wrapping the
    /// stage's error unchanged (see [`FaqError::root`]).
    pub async fn run(&self, request: &PipelineRequest) -> Result<Vec<QaPair>> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "faq.run",
            request_id = %request_id,
            num_questions = request.num_questions,
            source_len = request.source_text.len(),
        );

        let result = self.run_stages(request).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(pairs) => info!(qa_count = pairs.len(), "faq pipeline completed"),
            Err(e) => error!(error = %e, "faq pipeline failed"),
        });
        result
    }

    async fn run_stages(&self, request: &PipelineRequest) -> Result<Vec<QaPair>> {
        validate_question_count(request.num_questions)
            .map_err(|e| e.in_stage(Stage::GenerateQuestions))?;

        // 1. Chunk
        let mut chunks = info_span!("faq.chunk")
            .in_scope(|| self.chunker.chunk(&request.source_text))
            .map_err(|e| e.in_stage(Stage::Chunk))?;
        info!(chunk_count = chunks.len(), "chunked source text");

        // 2. Embed, memoised for the rest of this run
        let embedder = EmbeddingCache::new(self.embedding_provider.as_ref());
        let chunk_count = chunks.len();
        embed_collection(&embedder, &mut chunks)
            .instrument(info_span!("faq.embed", chunk_count))
            .await
            .map_err(|e| e.in_stage(Stage::Embed))?;

        // 3. Rank against the topic
        let context = self
            .topic_context(&chunks, &request.topic, &embedder)
            .instrument(info_span!("faq.rank", top_k = self.config.top_k))
            .await
            .map_err(|e| e.in_stage(Stage::Rank))?;

        // 4. Generate questions
        let questions = QuestionGenerator::new(self.completion_provider.as_ref(), &self.config)
            .generate(&context, &request.topic, &request.audience, request.num_questions)
            .instrument(info_span!("faq.questions", count = request.num_questions))
            .await
            .map_err(|e| e.in_stage(Stage::GenerateQuestions))?;

        // 5. Answer every question against the full collection
        let synthesizer = AnswerSynthesizer::new(
            &embedder,
            self.completion_provider.as_ref(),
            self.config.effective_answer_top_k(),
        )
        .with_similarity_threshold(self.config.similarity_threshold)
        .with_max_tokens(self.config.answer_max_tokens)
        .with_temperature(self.config.temperature);

        let answers = self.answer_all(&synthesizer, &questions, &chunks).await?;

        Ok(questions
            .into_iter()
            .zip(answers)
            .map(|(question, answer)| QaPair { question, answer })
            .collect())
    }

    /// Select and join the chunks most relevant to `topic`.
    ///
    /// A blank topic selects the leading chunks, which is what ranking
    /// against a zero vector yields under the index tie-break.
    async fn topic_context(
        &self,
        chunks: &ChunkCollection,
        topic: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<String> {
        let ranked = if topic.trim().is_empty() {
            let zero = vec![0.0; chunks.dimensions().unwrap_or_default()];
            rank_by_embedding(chunks, &zero, self.config.top_k)?
        } else {
            rank(chunks, topic, self.config.top_k, embedder).await?
        };

        let kept: Vec<ScoredChunk<'_>> =
            ranked.into_iter().filter(|r| r.score >= self.config.similarity_threshold).collect();
        if kept.is_empty() {
            return Err(FaqError::InvalidArgument(format!(
                "no chunk reaches the similarity threshold {}",
                self.config.similarity_threshold
            )));
        }
        info!(selected = kept.len(), best_score = kept[0].score, "selected question context");
        Ok(join_chunks(&kept))
    }

    /// Answer all questions with bounded concurrency, keeping question order.
    async fn answer_all(
        &self,
        synthesizer: &AnswerSynthesizer<'_>,
        questions: &[String],
        chunks: &ChunkCollection,
    ) -> Result<Vec<String>> {
        let mut slots: Vec<Option<String>> = vec![None; questions.len()];

        let pending: Vec<_> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                async move { (index, synthesizer.answer(question, chunks).await) }
                    .instrument(info_span!("faq.answer", question_index = index))
            })
            .collect();
        let mut in_flight = stream::iter(pending).buffer_unordered(self.config.answer_concurrency);

        while let Some((index, result)) = in_flight.next().await {
            slots[index] = Some(result.map_err(|e| e.in_stage(Stage::Answer))?);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Builder for constructing a [`FaqPipeline`].
///
/// The embedding and completion providers are required. The configuration
/// defaults to [`FaqConfig::default()`] and the chunker to a
/// [`BoundaryChunker`] using the configuration's chunk policy.
#[derive(Default)]
pub struct FaqPipelineBuilder {
    config: Option<FaqConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    completion_provider: Option<Arc<dyn CompletionProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl FaqPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: FaqConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the completion provider used for questions and answers.
    pub fn completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_provider = Some(provider);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`FaqPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::Config`] if a provider is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<FaqPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| FaqError::Config("embedding_provider is required".to_string()))?;
        let completion_provider = self
            .completion_provider
            .ok_or_else(|| FaqError::Config("completion_provider is required".to_string()))?;
        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(BoundaryChunker::new(config.chunk_policy())));

        Ok(FaqPipeline { config, embedding_provider, completion_provider, chunker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{HashEmbeddingProvider, MockCompletionProvider};

    #[test]
    fn builder_requires_providers() {
        let err = FaqPipeline::builder().build().err().unwrap();
        assert!(matches!(err, FaqError::Config(_)));

        let err = FaqPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("completion_provider"));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = FaqConfig { top_k: 0, ..FaqConfig::default() };
        let result = FaqPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .completion_provider(Arc::new(MockCompletionProvider::offline()))
            .build();
        assert!(matches!(result, Err(FaqError::Config(_))));
    }

    #[test]
    fn request_builder_sets_fields() {
        let request = PipelineRequest::new("text", 3).topic("soil").audience("farmers");
        assert_eq!(request.topic, "soil");
        assert_eq!(request.audience, "farmers");
        assert_eq!(request.num_questions, 3);
    }
}
