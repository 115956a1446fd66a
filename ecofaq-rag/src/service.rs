//! Request-level entry point: source selection, text fetch, FAQ generation
//! and illustration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span};

use crate::catalog::{NEXUS_BASE_URL, NexusSolution};
use crate::document::QaPair;
use crate::error::{FaqError, Result, Stage};
use crate::illustration::{IllustrationProvider, ImageRef};
use crate::pipeline::{FaqPipeline, PipelineRequest};
use crate::questions::validate_question_count;
use crate::source::TextSource;

/// Topic used when a request does not name one.
pub const DEFAULT_TOPIC: &str = "action items";
/// Audience used when a request does not name one.
pub const DEFAULT_AUDIENCE: &str = "students";
/// Default number of questions.
pub const DEFAULT_NUM_QUESTIONS: usize = 3;

/// A request for an FAQ about one Nexus solution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaqRequest {
    /// The solution page to use as source text.
    pub source: NexusSolution,
    /// Optional topic focus.
    #[serde(default)]
    pub topic: String,
    /// Optional audience.
    #[serde(default)]
    pub audience: String,
    /// Number of questions, 2 to 5.
    pub num_questions: usize,
}

impl FaqRequest {
    /// A request using the defaults above.
    pub fn new(source: NexusSolution) -> Self {
        Self {
            source,
            topic: DEFAULT_TOPIC.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            num_questions: DEFAULT_NUM_QUESTIONS,
        }
    }
}

/// The generated FAQ with its illustration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaqResponse {
    pub solution: NexusSolution,
    /// The page the source text came from.
    pub source_url: String,
    pub qa_pairs: Vec<QaPair>,
    pub illustration: ImageRef,
}

/// Ties a [`TextSource`], a [`FaqPipeline`] and an [`IllustrationProvider`]
/// together behind the `{source, topic, audience, num_questions}` request.
pub struct FaqService {
    pipeline: FaqPipeline,
    text_source: Arc<dyn TextSource>,
    illustrator: Arc<dyn IllustrationProvider>,
    base_url: String,
}

impl FaqService {
    pub fn new(
        pipeline: FaqPipeline,
        text_source: Arc<dyn TextSource>,
        illustrator: Arc<dyn IllustrationProvider>,
    ) -> Self {
        Self { pipeline, text_source, illustrator, base_url: NEXUS_BASE_URL.to_string() }
    }

    /// Resolve solution pages under `base_url` instead of the public site.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn pipeline(&self) -> &FaqPipeline {
        &self.pipeline
    }

    /// Fetch the solution page, then run the pipeline and the illustration
    /// call concurrently.
    ///
    /// # Errors
    ///
    /// The first failure wins and the other branch is dropped. Errors carry
    /// the failed [`Stage`].
    pub async fn generate(&self, request: &FaqRequest) -> Result<FaqResponse> {
        validate_question_count(request.num_questions)
            .map_err(|e| e.in_stage(Stage::GenerateQuestions))?;

        let source_url = request.source.url(&self.base_url);
        let span = info_span!("faq.request", solution = %request.source, url = %source_url);

        async {
            let text = self
                .text_source
                .fetch_text(&source_url)
                .await
                .map_err(|e| e.in_stage(Stage::Fetch))?;

            let pipeline_request = PipelineRequest {
                source_text: text,
                topic: request.topic.clone(),
                audience: request.audience.clone(),
                num_questions: request.num_questions,
            };
            let illustration_prompt = request.source.slug();

            let (qa_pairs, illustration) = futures::try_join!(
                self.pipeline.run(&pipeline_request),
                async {
                    self.illustrator
                        .illustrate(illustration_prompt)
                        .await
                        .map_err(|e: FaqError| e.in_stage(Stage::Illustrate))
                }
            )?;

            info!(qa_count = qa_pairs.len(), "faq generated");
            Ok::<_, FaqError>(FaqResponse {
                solution: request.source,
                source_url: source_url.clone(),
                qa_pairs,
                illustration,
            })
        }
        .instrument(span)
        .await
    }
}
