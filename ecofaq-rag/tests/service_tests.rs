//! Tests of the request-level FAQ service.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{THREE_QUESTIONS, agroforestry_article, asked_question, is_question_prompt};
use ecofaq_rag::{
    CachedTextSource, FaqError, FaqPipeline, FaqRequest, FaqService, HashEmbeddingProvider,
    IllustrationProvider, ImageRef, MockCompletionProvider, NexusSolution,
    PlaceholderIllustrator, Stage, StaticTextSource,
};

const BASE: &str = "mem://nexus/";

fn faq_pipeline() -> FaqPipeline {
    FaqPipeline::builder()
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .completion_provider(Arc::new(MockCompletionProvider::from_fn(|request| {
            if is_question_prompt(request) {
                Ok(THREE_QUESTIONS.to_string())
            } else {
                Ok(format!("Because of {}", asked_question(request)))
            }
        })))
        .build()
        .unwrap()
}

fn pages() -> StaticTextSource {
    StaticTextSource::new().with_page(format!("{BASE}agroforestry"), agroforestry_article())
}

#[tokio::test]
async fn generates_an_illustrated_faq_for_a_solution() {
    let service = FaqService::new(
        faq_pipeline(),
        Arc::new(pages()),
        Arc::new(PlaceholderIllustrator::default()),
    )
    .with_base_url(BASE);

    let mut request = FaqRequest::new(NexusSolution::Agroforestry);
    request.topic = "carbon sequestration".into();

    let response = service.generate(&request).await.unwrap();
    assert_eq!(response.solution, NexusSolution::Agroforestry);
    assert_eq!(response.source_url, "mem://nexus/agroforestry");
    assert_eq!(response.qa_pairs.len(), 3);
    assert_eq!(
        response.illustration,
        ImageRef::Url("https://placehold.co/512x512?text=agroforestry".into())
    );
}

#[test]
fn default_request_matches_the_form_defaults() {
    let request = FaqRequest::new(NexusSolution::Wind);
    assert_eq!(request.topic, "action items");
    assert_eq!(request.audience, "students");
    assert_eq!(request.num_questions, 3);
}

#[tokio::test]
async fn fetched_pages_are_reused() {
    let source = Arc::new(CachedTextSource::new(pages(), 8));
    let service =
        FaqService::new(faq_pipeline(), source.clone(), Arc::new(PlaceholderIllustrator::default()))
            .with_base_url(BASE);

    let request = FaqRequest::new(NexusSolution::Agroforestry);
    service.generate(&request).await.unwrap();
    service.generate(&request).await.unwrap();

    assert_eq!(source.len().await, 1);
    assert!(source.contains("mem://nexus/agroforestry").await);
}

#[tokio::test]
async fn missing_page_fails_in_fetch_stage() {
    let service = FaqService::new(
        faq_pipeline(),
        Arc::new(pages()),
        Arc::new(PlaceholderIllustrator::default()),
    )
    .with_base_url(BASE);

    let err = service.generate(&FaqRequest::new(NexusSolution::Wind)).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Fetch));
    assert!(matches!(err.root(), FaqError::Fetch { url, .. } if url == "mem://nexus/wind"));
}

struct RefusingIllustrator;

#[async_trait]
impl IllustrationProvider for RefusingIllustrator {
    async fn illustrate(&self, _prompt: &str) -> ecofaq_rag::Result<ImageRef> {
        Err(FaqError::ContentPolicy { service: "images".into(), message: "refused".into() })
    }
}

#[tokio::test]
async fn illustration_failure_fails_the_request() {
    let service = FaqService::new(faq_pipeline(), Arc::new(pages()), Arc::new(RefusingIllustrator))
        .with_base_url(BASE);

    let err = service.generate(&FaqRequest::new(NexusSolution::Agroforestry)).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Illustrate));
    assert!(matches!(err.root(), FaqError::ContentPolicy { .. }));
}

#[tokio::test]
async fn invalid_count_is_rejected_before_fetching() {
    let source = Arc::new(CachedTextSource::new(pages(), 8));
    let service =
        FaqService::new(faq_pipeline(), source.clone(), Arc::new(PlaceholderIllustrator::default()))
            .with_base_url(BASE);

    let mut request = FaqRequest::new(NexusSolution::Agroforestry);
    request.num_questions = 6;

    let err = service.generate(&request).await.unwrap_err();
    assert!(matches!(err.root(), FaqError::InvalidArgument(_)));
    assert_eq!(source.len().await, 0);
}
