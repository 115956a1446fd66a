//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use ecofaq_rag::CompletionRequest;

const TREES: [&str; 6] = ["walnut", "poplar", "cacao", "coffee", "gliricidia", "acacia"];
const CROPS: [&str; 5] = ["maize", "beans", "barley", "cassava", "wheat"];

/// An agroforestry article of about two thousand words in eighteen
/// paragraphs. Every sentence starts differently.
pub fn agroforestry_article() -> String {
    (0..18)
        .map(|p| {
            (0..4)
                .map(|s| {
                    let n = p * 4 + s;
                    let tree = TREES[n % TREES.len()];
                    let crop = CROPS[n % CROPS.len()];
                    format!(
                        "In field {n} the farmers grew {tree} trees between rows of {crop}, \
                         and carbon sequestration in the soil rose as roots and leaf litter \
                         added organic matter over many seasons."
                    )
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Whether `request` is a question generation prompt.
pub fn is_question_prompt(request: &CompletionRequest) -> bool {
    request.prompt.contains("distinct questions")
}

/// The question of an answer prompt.
pub fn asked_question(request: &CompletionRequest) -> String {
    request
        .prompt
        .lines()
        .find_map(|line| line.strip_prefix("Question: "))
        .unwrap_or_default()
        .to_string()
}

pub const THREE_QUESTIONS: &str = "1. What is agroforestry?\n\
                                   2. How do trees store carbon in soil?\n\
                                   3. Which crops grow between the trees?";
