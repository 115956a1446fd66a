//! Error types for the `ecofaq-rag` crate.

use std::fmt;

use thiserror::Error;

/// A step of the FAQ pipeline, used to tag the error that aborted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetching the source text.
    Fetch,
    /// Splitting the source text into chunks.
    Chunk,
    /// Embedding the chunks.
    Embed,
    /// Ranking chunks against the topic.
    Rank,
    /// Generating the questions.
    GenerateQuestions,
    /// Answering one of the generated questions.
    Answer,
    /// Generating the illustration.
    Illustrate,
}

impl Stage {
    /// Short lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Chunk => "chunk",
            Stage::Embed => "embed",
            Stage::Rank => "rank",
            Stage::GenerateQuestions => "generate_questions",
            Stage::Answer => "answer",
            Stage::Illustrate => "illustrate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while generating FAQs.
#[derive(Debug, Error)]
pub enum FaqError {
    /// The source text was empty or contained only whitespace.
    #[error("source text is empty")]
    EmptyInput,

    /// An argument was outside its accepted range (top_k, question count, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding vectors of different dimensions were mixed.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension established by the collection.
        expected: usize,
        /// The offending dimension.
        actual: usize,
    },

    /// The external service could not be reached or failed server-side.
    #[error("service unavailable ({service}): {message}")]
    ServiceUnavailable {
        /// The service that failed.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// The external service rejected the call because of rate limiting.
    #[error("rate limited ({service}): {message}")]
    RateLimited {
        /// The service that rejected the call.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// The external service rejected the credentials.
    #[error("authentication failed ({service}): {message}")]
    Authentication {
        /// The service that rejected the credentials.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// The external service rejected the request as malformed.
    #[error("invalid request ({service}): {message}")]
    InvalidRequest {
        /// The service that rejected the request.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation service refused the prompt or filtered its output.
    #[error("content policy rejection ({service}): {message}")]
    ContentPolicy {
        /// The service that refused.
        service: String,
        /// A description of the refusal.
        message: String,
    },

    /// The language model returned output that could not be used.
    #[error("could not parse generated output: {0}")]
    GenerationParse(String),

    /// The language model produced the same question more than once.
    #[error("duplicate generated question: {0}")]
    DuplicateQuestion(String),

    /// The text source failed to provide text for a URL.
    #[error("failed to fetch '{url}': {message}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed; `source` is the stage's error, unchanged.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// The error reported by the stage.
        #[source]
        source: Box<FaqError>,
    },
}

impl FaqError {
    /// Tag this error with the stage that produced it.
    ///
    /// Errors that already carry a stage are returned as they are.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            FaqError::Stage { .. } => self,
            other => FaqError::Stage { stage, source: Box::new(other) },
        }
    }

    /// The stage that failed, if the error was raised by the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FaqError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying component error, without the stage wrapper.
    pub fn root(&self) -> &FaqError {
        match self {
            FaqError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            FaqError::ServiceUnavailable { .. } | FaqError::RateLimited { .. }
        )
    }
}

/// A convenience result type for FAQ operations.
pub type Result<T> = std::result::Result<T, FaqError>;
