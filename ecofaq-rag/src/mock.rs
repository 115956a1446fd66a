//! Deterministic in-process backends for tests, demos and offline runs.
//!
//! Nothing here calls a network service. [`HashEmbeddingProvider`] gives
//! lexical similarity through feature hashing, and [`MockCompletionProvider`]
//! answers prompts from a script, a closure or a simple offline heuristic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use regex::Regex;

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::embedding::EmbeddingProvider;
use crate::error::{FaqError, Result};

/// Embeds text as an L2-normalised bag of hashed lowercase words.
///
/// Texts sharing words get a positive cosine similarity, so ranking behaves
/// sensibly without a model. The same text always yields the same vector.
#[derive(Debug)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1), calls: AtomicUsize::new(0) }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }

        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync;

static REQUESTED_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"exactly (\d+) distinct").expect("count pattern is valid"));
static QUOTED_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"""\n(.*?)\n""""#).expect("context pattern is valid"));

/// A [`CompletionProvider`] that records prompts and answers them locally.
pub struct MockCompletionProvider {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    /// Answer every request with `f`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self { responder: Box::new(f), prompts: Mutex::new(Vec::new()) }
    }

    /// Return `responses` in order; fails with [`FaqError::ServiceUnavailable`]
    /// once they run out.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(responses.into_iter().map(Into::into).collect());
        Self::from_fn(move |_| {
            queue.lock().ok().and_then(|mut q| q.pop_front()).ok_or_else(|| {
                FaqError::ServiceUnavailable {
                    service: "mock".into(),
                    message: "no scripted response left".into(),
                }
            })
        })
    }

    /// Produce plausible output for the FAQ prompts without a model.
    ///
    /// Question prompts get one question per context sentence; answer prompts
    /// get the leading sentences of their context.
    pub fn offline() -> Self {
        Self::from_fn(|request| {
            let context = QUOTED_CONTEXT
                .captures(&request.prompt)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let sentences: Vec<&str> = context
                .split_inclusive(['.', '!', '?'])
                .map(str::trim)
                .filter(|s| s.split_whitespace().count() > 3)
                .collect();

            if let Some(count) = REQUESTED_COUNT
                .captures(&request.prompt)
                .and_then(|c| c[1].parse::<usize>().ok())
            {
                let questions: Vec<String> = (0..count)
                    .map(|i| {
                        let subject = sentences
                            .get(i)
                            .map(|s| {
                                s.split_whitespace().take(6).collect::<Vec<_>>().join(" ")
                            })
                            .unwrap_or_else(|| format!("point {}", i + 1));
                        format!("{}. What does the text say about \"{subject}\"?", i + 1)
                    })
                    .collect();
                return Ok(questions.join("\n"));
            }

            Ok(sentences.iter().take(2).copied().collect::<Vec<_>>().join(" "))
        })
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        (self.responder)(&request)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::build_answer_prompt;
    use crate::questions::{build_question_prompt, parse_questions};
    use crate::ranking::cosine_similarity;

    #[tokio::test]
    async fn hash_embeddings_reflect_shared_words() {
        let provider = HashEmbeddingProvider::new(128);
        let a = provider.embed("Trees capture carbon in soil").await.unwrap();
        let b = provider.embed("How do trees capture carbon?").await.unwrap();
        let c = provider.embed("Electric buses reduce noise").await.unwrap();

        assert_eq!(a.len(), 128);
        assert_eq!(a, provider.embed("Trees capture carbon in soil").await.unwrap());
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn scripted_responses_run_out() {
        let mock = MockCompletionProvider::scripted(["first"]);
        assert_eq!(mock.complete(CompletionRequest::new("a")).await.unwrap(), "first");
        let err = mock.complete(CompletionRequest::new("b")).await.unwrap_err();
        assert!(matches!(err, FaqError::ServiceUnavailable { .. }));
        assert_eq!(mock.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn offline_output_satisfies_the_parsers() {
        let mock = MockCompletionProvider::offline();
        let context = "Agroforestry mixes trees with crops. Trees store carbon in wood and soil. \
                       Farmers gain shade and fruit.";

        let prompt = build_question_prompt(context, "carbon", "students", 3);
        let output = mock.complete(CompletionRequest::new(prompt)).await.unwrap();
        let questions = parse_questions(&output, 3).unwrap();
        assert_eq!(questions.len(), 3);

        let answer = mock
            .complete(CompletionRequest::new(build_answer_prompt(&questions[0], context)))
            .await
            .unwrap();
        assert_eq!(answer, "Agroforestry mixes trees with crops. Trees store carbon in wood and soil.");
    }
}
