//! Context-grounded answer synthesis.

use tracing::debug;

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::document::ChunkCollection;
use crate::embedding::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::ranking::{join_chunks, rank};

/// Build the answer prompt for one question.
pub fn build_answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the information in the text below. \
         Write two to four clear sentences.\n\n\
         Text:\n\"\"\"\n{context}\n\"\"\"\n\n\
         Question: {question}\n\
         Answer:"
    )
}

/// Answers questions by re-retrieving context from the chunk collection.
pub struct AnswerSynthesizer<'a> {
    embedder: &'a dyn EmbeddingProvider,
    completer: &'a dyn CompletionProvider,
    top_k: usize,
    similarity_threshold: f32,
    max_tokens: u32,
    temperature: f32,
}

impl<'a> AnswerSynthesizer<'a> {
    pub fn new(
        embedder: &'a dyn EmbeddingProvider,
        completer: &'a dyn CompletionProvider,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            completer,
            top_k,
            similarity_threshold: f32::MIN,
            max_tokens: 400,
            temperature: 0.7,
        }
    }

    /// Drop retrieved chunks scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `question` from the chunks of `corpus` most similar to it.
    ///
    /// # Errors
    ///
    /// - Ranking errors ([`FaqError::InvalidArgument`], embedding failures).
    /// - [`FaqError::InvalidArgument`] if no retrieved chunk reaches the
    ///   similarity threshold; the model is not called.
    /// - [`FaqError::GenerationParse`] if the model returns only whitespace.
    /// - Provider errors, unchanged.
    pub async fn answer(&self, question: &str, corpus: &ChunkCollection) -> Result<String> {
        let ranked = rank(corpus, question, self.top_k, self.embedder).await?;
        let kept: Vec<_> =
            ranked.into_iter().filter(|r| r.score >= self.similarity_threshold).collect();
        if kept.is_empty() {
            return Err(FaqError::InvalidArgument(format!(
                "no chunk reaches the similarity threshold {} for question '{question}'",
                self.similarity_threshold
            )));
        }
        let context = join_chunks(&kept);

        let request = CompletionRequest::new(build_answer_prompt(question, &context))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        let answer = self.completer.complete(request).await?.trim().to_string();

        if answer.is_empty() {
            return Err(FaqError::GenerationParse(format!("empty answer for question '{question}'")));
        }

        debug!(context_chunks = kept.len(), answer_len = answer.len(), "answered question");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{BoundaryChunker, ChunkPolicy, Chunker};
    use crate::embedding::embed_collection;
    use crate::mock::{HashEmbeddingProvider, MockCompletionProvider};

    async fn embedded(text: &str, embedder: &HashEmbeddingProvider) -> ChunkCollection {
        let policy = ChunkPolicy { max_size: 40, ..ChunkPolicy::default() };
        let mut chunks = BoundaryChunker::new(policy).chunk(text).unwrap();
        embed_collection(embedder, &mut chunks).await.unwrap();
        chunks
    }

    #[tokio::test]
    async fn answers_from_chunks_above_the_threshold() {
        let embedder = HashEmbeddingProvider::default();
        let completer = MockCompletionProvider::scripted(["Trees shade the crops."]);
        let chunks = embedded("Shade trees cool the crops.\n\nBuses run on batteries.", &embedder).await;

        let answer = AnswerSynthesizer::new(&embedder, &completer, 2)
            .with_similarity_threshold(0.1)
            .answer("Why do shade trees help crops?", &chunks)
            .await
            .unwrap();

        assert_eq!(answer, "Trees shade the crops.");
        let prompt = &completer.prompts()[0];
        assert!(prompt.contains("Shade trees cool the crops."));
        assert!(!prompt.contains("Buses run on batteries."));
    }

    #[tokio::test]
    async fn nothing_above_the_threshold_is_an_error_without_a_call() {
        let embedder = HashEmbeddingProvider::default();
        let completer = MockCompletionProvider::offline();
        let chunks = embedded("Shade trees cool the crops.", &embedder).await;

        let result = AnswerSynthesizer::new(&embedder, &completer, 2)
            .with_similarity_threshold(0.1)
            .answer("Which wind turbines suit islands?", &chunks)
            .await;

        assert!(matches!(result, Err(FaqError::InvalidArgument(_))));
        assert_eq!(completer.calls(), 0);
    }

    #[test]
    fn prompt_contains_question_and_context() {
        let prompt = build_answer_prompt("Why plant trees?", "Trees store carbon.");
        assert!(prompt.contains("Question: Why plant trees?"));
        assert!(prompt.contains("Trees store carbon."));
        assert!(prompt.ends_with("Answer:"));
    }
}
