//! Question generation from retrieved context.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::config::{DuplicatePolicy, FaqConfig};
use crate::error::{FaqError, Result};

/// Smallest number of questions that can be requested.
pub const MIN_QUESTIONS: usize = 2;
/// Largest number of questions that can be requested.
pub const MAX_QUESTIONS: usize = 5;

const DEFAULT_TOPIC_FRAMING: &str = "the main ideas of the text";
const DEFAULT_AUDIENCE: &str = "a general audience";

/// Matches list markers such as `1.`, `2)`, `Q3:`, `Question 4.`, `-` or `*`.
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:(?i:q(?:uestion)?)\s*)?\d{1,2}\s*[.):]|[-*•])\s*")
        .expect("list marker pattern is valid")
});

/// Check that `count` is within [`MIN_QUESTIONS`]..=[`MAX_QUESTIONS`].
pub fn validate_question_count(count: usize) -> Result<()> {
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
        return Err(FaqError::InvalidArgument(format!(
            "number of questions must be between {MIN_QUESTIONS} and {MAX_QUESTIONS}, got {count}"
        )));
    }
    Ok(())
}

/// Build the question generation prompt.
///
/// An empty `topic` asks about the main ideas of the text; an empty
/// `audience` targets a general audience.
pub fn build_question_prompt(context: &str, topic: &str, audience: &str, count: usize) -> String {
    let topic = topic.trim();
    let audience = audience.trim();
    let framing =
        if topic.is_empty() { DEFAULT_TOPIC_FRAMING.to_string() } else { format!("\"{topic}\"") };
    let audience = if audience.is_empty() { DEFAULT_AUDIENCE } else { audience };

    format!(
        "You are writing a frequently-asked-questions section for {audience}.\n\
         Read the text below and write exactly {count} distinct questions about {framing} \
         that the text answers.\n\n\
         Text:\n\"\"\"\n{context}\n\"\"\"\n\n\
         Return the {count} questions as a numbered list, one question per line, \
         with no other text."
    )
}

/// Parse generated output into exactly `count` questions.
///
/// When the output is a list, unmarked lines before the first list marker
/// are treated as a preamble (e.g. "Here are three questions:") and skipped.
/// An unmarked line after the list has started is rejected.
///
/// # Errors
///
/// Returns [`FaqError::GenerationParse`] if the output does not contain
/// exactly `count` non-empty questions, or if a list contains unmarked lines.
pub fn parse_questions(output: &str, count: usize) -> Result<Vec<String>> {
    let lines: Vec<&str> = output.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let questions: Vec<String> = match lines.iter().position(|l| LIST_MARKER.is_match(l)) {
        Some(first) => {
            let mut questions = Vec::with_capacity(lines.len() - first);
            for line in &lines[first..] {
                if !LIST_MARKER.is_match(line) {
                    return Err(FaqError::GenerationParse(format!(
                        "unexpected unnumbered line in question list: '{line}'"
                    )));
                }
                questions.push(LIST_MARKER.replace(line, "").trim().to_string());
            }
            questions.retain(|q| !q.is_empty());
            questions
        }
        None => lines.into_iter().map(str::to_string).collect(),
    };

    if questions.len() != count {
        return Err(FaqError::GenerationParse(format!(
            "expected {count} questions, got {}",
            questions.len()
        )));
    }
    Ok(questions)
}

/// Key under which two questions count as the same question.
fn normalize(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '.', '!'])
        .to_lowercase()
}

/// Return the first question that repeats an earlier one.
pub fn find_duplicate(questions: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    questions.iter().find(|q| !seen.insert(normalize(q))).map(String::as_str)
}

/// Generates FAQ questions with a [`CompletionProvider`].
pub struct QuestionGenerator<'a> {
    provider: &'a dyn CompletionProvider,
    max_tokens: u32,
    temperature: f32,
    duplicate_policy: DuplicatePolicy,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, config: &FaqConfig) -> Self {
        Self {
            provider,
            max_tokens: config.question_max_tokens,
            temperature: config.temperature,
            duplicate_policy: config.duplicate_policy,
        }
    }

    /// Generate exactly `count` distinct questions about `context`.
    ///
    /// # Errors
    ///
    /// - [`FaqError::InvalidArgument`] if `count` is outside 2..=5; no call is made.
    /// - [`FaqError::GenerationParse`] if the output is not `count` questions.
    /// - [`FaqError::DuplicateQuestion`] if questions repeat and the policy
    ///   does not allow (further) resampling.
    /// - Provider errors, unchanged.
    pub async fn generate(
        &self,
        context: &str,
        topic: &str,
        audience: &str,
        count: usize,
    ) -> Result<Vec<String>> {
        validate_question_count(count)?;

        let extra_attempts = match self.duplicate_policy {
            DuplicatePolicy::Reject => 0,
            DuplicatePolicy::Resample { attempts } => attempts,
        };
        let request = CompletionRequest::new(build_question_prompt(context, topic, audience, count))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let mut attempt = 0;
        loop {
            let output = self.provider.complete(request.clone()).await?;
            let questions = parse_questions(&output, count)?;

            match find_duplicate(&questions) {
                None => {
                    debug!(model = self.provider.name(), count, attempt, "generated questions");
                    return Ok(questions);
                }
                Some(duplicate) if attempt < extra_attempts => {
                    warn!(duplicate, attempt, "duplicate question generated, resampling");
                    attempt += 1;
                }
                Some(duplicate) => return Err(FaqError::DuplicateQuestion(duplicate.to_string())),
            }
        }
    }
}
