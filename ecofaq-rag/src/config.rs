//! Configuration for the FAQ pipeline.

use serde::{Deserialize, Serialize};

use crate::chunking::{ChunkPolicy, LengthUnit};
use crate::error::{FaqError, Result};

/// How the question generator treats repeated questions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum DuplicatePolicy {
    /// Fail with [`FaqError::DuplicateQuestion`].
    #[default]
    Reject,
    /// Ask the model again, up to `attempts` extra times, before failing.
    Resample {
        /// Number of additional generation attempts.
        attempts: usize,
    },
}

/// Configuration parameters for the FAQ pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaqConfig {
    /// Maximum chunk size, measured in `length_unit`.
    pub chunk_size: usize,
    /// Size of the overlap between consecutive chunks, measured in `length_unit`.
    pub chunk_overlap: usize,
    /// Unit used to measure chunk sizes.
    pub length_unit: LengthUnit,
    /// Number of chunks retrieved as context for question generation.
    pub top_k: usize,
    /// Number of chunks retrieved per question. Falls back to `top_k`.
    pub answer_top_k: Option<usize>,
    /// Minimum similarity score for retrieved chunks.
    pub similarity_threshold: f32,
    /// Maximum number of answers generated concurrently.
    pub answer_concurrency: usize,
    /// Token budget for the question generation call.
    pub question_max_tokens: u32,
    /// Token budget for each answer generation call.
    pub answer_max_tokens: u32,
    /// Sampling temperature for both generation calls.
    pub temperature: f32,
    /// Handling of repeated generated questions.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for FaqConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            length_unit: LengthUnit::Chars,
            top_k: 4,
            answer_top_k: None,
            similarity_threshold: f32::MIN,
            answer_concurrency: 4,
            question_max_tokens: 300,
            answer_max_tokens: 400,
            temperature: 0.7,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

impl FaqConfig {
    /// Create a new builder for constructing a [`FaqConfig`].
    pub fn builder() -> FaqConfigBuilder {
        FaqConfigBuilder::default()
    }

    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FaqConfig = serde_json::from_str(json)
            .map_err(|e| FaqError::Config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// The chunking policy described by this configuration.
    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy { max_size: self.chunk_size, overlap: self.chunk_overlap, unit: self.length_unit }
    }

    /// The number of chunks retrieved per question.
    pub fn effective_answer_top_k(&self) -> usize {
        self.answer_top_k.unwrap_or(self.top_k)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::Config`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `answer_top_k == Some(0)`
    /// - `answer_concurrency == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FaqError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(FaqError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(FaqError::Config("top_k must be greater than zero".to_string()));
        }
        if self.answer_top_k == Some(0) {
            return Err(FaqError::Config("answer_top_k must be greater than zero".to_string()));
        }
        if self.answer_concurrency == 0 {
            return Err(FaqError::Config(
                "answer_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`FaqConfig`].
#[derive(Debug, Clone, Default)]
pub struct FaqConfigBuilder {
    config: FaqConfig,
}

impl FaqConfigBuilder {
    /// Set the maximum chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the unit used to measure chunk sizes.
    pub fn length_unit(mut self, unit: LengthUnit) -> Self {
        self.config.length_unit = unit;
        self
    }

    /// Set the number of chunks used as question-generation context.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn answer_top_k(mut self, k: usize) -> Self {
        self.config.answer_top_k = Some(k);
        self
    }

    /// Set the minimum similarity threshold for retrieved chunks.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set how many answers may be generated at once.
    pub fn answer_concurrency(mut self, n: usize) -> Self {
        self.config.answer_concurrency = n;
        self
    }

    /// Set the token budget of the question generation call.
    pub fn question_max_tokens(mut self, tokens: u32) -> Self {
        self.config.question_max_tokens = tokens;
        self
    }

    /// Set the token budget of each answer generation call.
    pub fn answer_max_tokens(mut self, tokens: u32) -> Self {
        self.config.answer_max_tokens = tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the duplicate question policy.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Build the [`FaqConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`FaqConfig::validate`].
    pub fn build(self) -> Result<FaqConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FaqConfig::default();
        assert_eq!(config.top_k, 4);
        assert_eq!(config.effective_answer_top_k(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = FaqConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, FaqError::Config(_)));
    }

    #[test]
    fn rejects_zero_top_k_and_concurrency() {
        assert!(FaqConfig::builder().top_k(0).build().is_err());
        assert!(FaqConfig::builder().answer_top_k(0).build().is_err());
        assert!(FaqConfig::builder().answer_concurrency(0).build().is_err());
    }

    #[test]
    fn parses_partial_json() {
        let config = FaqConfig::from_json_str(
            r#"{ "top_k": 6, "length_unit": "tokens", "duplicate_policy": { "policy": "resample", "attempts": 2 } }"#,
        )
        .unwrap();
        assert_eq!(config.top_k, 6);
        assert_eq!(config.length_unit, LengthUnit::Tokens);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Resample { attempts: 2 });
        assert_eq!(config.chunk_size, FaqConfig::default().chunk_size);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = FaqConfig::from_json_str(r#"{ "top_k": 0 }"#).unwrap_err();
        assert!(matches!(err, FaqError::Config(_)));
    }
}
