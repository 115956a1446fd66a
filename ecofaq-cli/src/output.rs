//! Plain-text rendering of command results.

use std::fmt::Write;

use ecofaq_rag::{FaqResponse, ImageRef, NexusSolution, QaPair};

pub fn render_pairs(pairs: &[QaPair]) -> String {
    let mut out = String::new();
    for (i, pair) in pairs.iter().enumerate() {
        let _ = writeln!(out, "Q{}. {}", i + 1, pair.question);
        let _ = writeln!(out, "    {}\n", pair.answer);
    }
    out
}

pub fn render_response(response: &FaqResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", response.solution.title());
    let _ = writeln!(out, "Source: {}\n", response.source_url);
    out.push_str(&render_pairs(&response.qa_pairs));
    match &response.illustration {
        ImageRef::Url(url) => {
            let _ = writeln!(out, "Illustration: {url}");
        }
        ImageRef::Base64(data) => {
            let _ = writeln!(out, "Illustration: inline image ({} base64 bytes)", data.len());
        }
    }
    out
}

pub fn render_catalog(solutions: &[NexusSolution]) -> String {
    let mut out = String::new();
    for solution in solutions {
        let _ = writeln!(out, "{:<28} {}", solution.slug(), solution.title());
    }
    out
}
