use tracing::{Instrument, info_span};
use tracing_subscriber::layer::SubscriberExt;

use crate::memory::{InMemorySpanLayer, SpanRecorder};

fn capture() -> (SpanRecorder, tracing::subscriber::DefaultGuard) {
    let recorder = SpanRecorder::new();
    let subscriber =
        tracing_subscriber::registry().with(InMemorySpanLayer::new(recorder.clone()));
    (recorder, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn captures_spans_under_request_id() {
    let (recorder, _guard) = capture();

    async {
        info_span!("faq.chunk").in_scope(|| tracing::info!("chunking"));
        async {}.instrument(info_span!("faq.embed", chunk_count = 3)).await;
    }
    .instrument(info_span!("faq.run", request_id = "req-1"))
    .await;

    let spans = recorder.spans_for("req-1");
    let names: Vec<&str> = spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["faq.run", "faq.chunk", "faq.embed"]);

    let embed = &spans[2];
    assert_eq!(embed.attribute_str("request_id"), Some("req-1"));
    assert_eq!(embed.attributes.get("chunk_count"), Some(&serde_json::json!(3)));
    assert_eq!(embed.parent_id.as_deref(), Some(spans[0].id.as_str()));
    assert!(embed.end_time >= embed.start_time);
}

#[test]
fn spans_without_request_id_are_ignored() {
    let (recorder, _guard) = capture();
    info_span!("unrelated", solution = "wind").in_scope(|| {});
    assert!(recorder.request_ids().is_empty());
}

#[test]
fn requests_are_kept_apart() {
    let (recorder, _guard) = capture();
    info_span!("faq.run", request_id = "a").in_scope(|| {});
    info_span!("faq.run", request_id = "b").in_scope(|| {
        info_span!("faq.rank", request_id = "b").in_scope(|| {});
    });

    assert_eq!(recorder.request_ids(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(recorder.spans_for("a").len(), 1);
    assert_eq!(recorder.spans_for("b").len(), 2);

    recorder.clear();
    assert!(recorder.spans_for("b").is_empty());
}

#[test]
fn recorded_fields_are_merged() {
    let (recorder, _guard) = capture();
    let span = info_span!("faq.run", request_id = "r", qa_count = tracing::field::Empty);
    span.record("qa_count", 3u64);
    drop(span);

    let spans = recorder.spans_for("r");
    assert_eq!(spans[0].attributes.get("qa_count"), Some(&serde_json::json!(3)));
}

#[test]
fn span_record_serializes_with_span_id() {
    let (recorder, _guard) = capture();
    info_span!("faq.run", request_id = "s").in_scope(|| {});

    let json = serde_json::to_string(&recorder.spans_for("s")[0]).unwrap();
    assert!(json.contains("\"span_id\""));
    assert!(!json.contains("parent_span_id"));
}
