//! Article text extraction from HTML pages.
//!
//! Solution pages arrive as full HTML documents with navigation, scripts and
//! footers around the article. [`extract_article_text`] keeps the readable
//! body: headings, paragraphs, list items and quotes from the page's
//! `<article>` or `<main>` element, one block per paragraph.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Containers tried in order when looking for the article body.
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article", "main", "[role=main]", "body"]
        .into_iter()
        .map(|s| Selector::parse(s).expect("content root selector is valid"))
        .collect()
});

static TEXT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, blockquote, pre")
        .expect("text block selector is valid")
});

const BLOCK_TAGS: &[&str] =
    &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "blockquote", "pre"];

/// Page furniture whose text never belongs to the article.
const BOILERPLATE_TAGS: &[&str] =
    &["nav", "header", "footer", "aside", "form", "script", "style", "noscript", "template"];

/// Extract the readable article text from an HTML document.
///
/// Returns `None` when the page has no visible text.
///
/// # Example
///
/// ```rust,ignore
/// use ecofaq_rag::extract::extract_article_text;
///
/// let text = extract_article_text("<article><p>Azolla fixes nitrogen.</p></article>");
/// assert_eq!(text.as_deref(), Some("Azolla fixes nitrogen."));
/// ```
pub fn extract_article_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let root = CONTENT_ROOTS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());

    let blocks: Vec<String> = root
        .select(&TEXT_BLOCKS)
        .filter(|block| !nested_in_skipped(block))
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .collect();

    let text = if blocks.is_empty() { visible_text(root) } else { blocks.join("\n\n") };
    (!text.is_empty()).then_some(text)
}

/// Whether `element` sits inside page furniture or inside another text block.
fn nested_in_skipped(element: &ElementRef<'_>) -> bool {
    element.ancestors().filter_map(|node| node.value().as_element()).any(|parent| {
        BOILERPLATE_TAGS.contains(&parent.name()) || BLOCK_TAGS.contains(&parent.name())
    })
}

/// Whitespace-normalised text of `element`, without script and style content.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|n| n.value().as_element())
            .any(|e| BOILERPLATE_TAGS.contains(&e.name()));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_the_article_element() {
        let html = "<html><body><nav><a>Home</a></nav>\
                    <article><h1>Azolla</h1><p>A fern that  fixes\n nitrogen.</p></article>\
                    <footer><p>Contact us</p></footer></body></html>";
        assert_eq!(
            extract_article_text(html).as_deref(),
            Some("Azolla\n\nA fern that fixes nitrogen.")
        );
    }

    #[test]
    fn skips_scripts_and_nested_blocks() {
        let html = "<main><script>var x = 1;</script>\
                    <ul><li><p>Rice paddies</p></li></ul><p>Ducks eat weeds.</p></main>";
        assert_eq!(
            extract_article_text(html).as_deref(),
            Some("Rice paddies\n\nDucks eat weeds.")
        );
    }

    #[test]
    fn falls_back_to_body_text() {
        let html = "<body><div>Plain <b>div</b> text</div><style>p { }</style></body>";
        assert_eq!(extract_article_text(html).as_deref(), Some("Plain div text"));
    }

    #[test]
    fn empty_page_has_no_text() {
        assert_eq!(extract_article_text("<html><head><title>x</title></head></html>"), None);
    }
}
