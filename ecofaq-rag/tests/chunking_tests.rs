//! Property tests for boundary chunking.

use ecofaq_rag::chunking::{BoundaryChunker, ChunkPolicy, Chunker, LengthUnit};
use proptest::prelude::*;

/// Generate prose-like text: short words joined by spaces, line breaks,
/// paragraph breaks and sentence ends.
fn arb_text(max_word: usize) -> impl Strategy<Value = String> {
    let word = proptest::string::string_regex(&format!("[a-zé]{{1,{max_word}}}"))
        .expect("word pattern is valid");
    let separator = prop_oneof![
        6 => Just(" "),
        1 => Just("\n"),
        1 => Just("\n\n"),
        2 => Just(". "),
        1 => Just("? "),
    ];
    proptest::collection::vec((word, separator), 1..120).prop_map(|parts| {
        parts.into_iter().map(|(w, s)| format!("{w}{s}")).collect::<String>()
    })
}

fn arb_unit() -> impl Strategy<Value = LengthUnit> {
    prop_oneof![Just(LengthUnit::Chars), Just(LengthUnit::Tokens)]
}

/// *For any* text and size, chunking without overlap yields ordered,
/// disjoint spans whose text is the source slice, and everything outside
/// the spans is whitespace.
mod prop_reconstruction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn spans_cover_all_non_whitespace(
            text in arb_text(12),
            max_size in 1usize..80,
            unit in arb_unit(),
        ) {
            let chunker = BoundaryChunker::new(ChunkPolicy { max_size, overlap: 0, unit });
            let chunks = chunker.chunk(&text).unwrap();
            prop_assert!(!chunks.is_empty());

            let mut covered_to = 0;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert_eq!(&text[chunk.span.clone()], chunk.text.as_str());
                prop_assert!(chunk.span.start >= covered_to, "spans overlap");
                prop_assert!(text[covered_to..chunk.span.start].trim().is_empty());
                prop_assert!(!chunk.text.trim().is_empty());
                covered_to = chunk.span.end;
            }
            prop_assert!(text[covered_to..].trim().is_empty());
        }
    }
}

/// *For any* policy, every chunk fits the size bound in the policy's unit,
/// with or without overlap.
mod prop_size_bound {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_never_exceed_max_size(
            text in arb_text(30),
            max_size in 1usize..60,
            overlap_ratio in 0usize..4,
            unit in arb_unit(),
        ) {
            let overlap = max_size * overlap_ratio / 4;
            let chunker = BoundaryChunker::new(ChunkPolicy { max_size, overlap, unit });
            for chunk in &chunker.chunk(&text).unwrap() {
                prop_assert!(
                    unit.measure(&chunk.text) <= max_size,
                    "chunk {:?} exceeds {} {:?}", chunk.text, max_size, unit
                );
            }
        }

        #[test]
        fn overlapping_chunks_still_cover_the_text(
            text in arb_text(8),
            max_size in 10usize..60,
            overlap in 1usize..9,
        ) {
            let chunker =
                BoundaryChunker::new(ChunkPolicy { max_size, overlap, unit: LengthUnit::Chars });
            let chunks = chunker.chunk(&text).unwrap();

            let mut covered = vec![false; text.len()];
            let mut last_start = 0;
            for chunk in &chunks {
                prop_assert!(chunk.span.start >= last_start, "chunks out of order");
                last_start = chunk.span.start;
                covered[chunk.span.clone()].iter_mut().for_each(|c| *c = true);
            }
            for (pos, ch) in text.char_indices() {
                prop_assert!(covered[pos] || ch.is_whitespace(), "byte {} not covered", pos);
            }
        }
    }
}

/// *For any* text whose words all fit within the size bound, no chunk starts
/// or ends inside a word.
mod prop_word_boundaries {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn words_are_never_split(
            text in arb_text(8),
            max_size in 10usize..80,
        ) {
            let chunker =
                BoundaryChunker::new(ChunkPolicy { max_size, overlap: 0, unit: LengthUnit::Chars });
            for chunk in &chunker.chunk(&text).unwrap() {
                let before = text[..chunk.span.start].chars().next_back();
                let after = text[chunk.span.end..].chars().next();
                prop_assert!(before.is_none_or(char::is_whitespace), "split before {:?}", chunk.text);
                prop_assert!(after.is_none_or(char::is_whitespace), "split after {:?}", chunk.text);
            }
        }
    }
}

#[test]
fn whitespace_only_text_is_rejected() {
    let chunker = BoundaryChunker::default();
    assert!(matches!(chunker.chunk(" \n\n \t"), Err(ecofaq_rag::FaqError::EmptyInput)));
}

#[test]
fn token_budget_packs_about_four_chars_per_token() {
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
    let chunker =
        BoundaryChunker::new(ChunkPolicy { max_size: 5, overlap: 0, unit: LengthUnit::Tokens });
    let chunks = chunker.chunk(text).unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.text.chars().count() <= 20);
    }
}
