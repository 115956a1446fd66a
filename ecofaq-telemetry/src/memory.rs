//! In-memory span capture.
//!
//! [`InMemorySpanLayer`] records every closed span that carries a
//! `request_id` (directly or inherited from a parent span) into a shared
//! [`SpanRecorder`], so a pipeline run can be inspected after the fact.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::Serialize;
use tracing::span::{Attributes, Record};
use tracing::{Id, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Fields copied from a parent span when the child does not set them.
pub const CONTEXT_KEYS: &[&str] = &["request_id", "solution"];

/// The field spans are grouped by.
pub const REQUEST_KEY: &str = "request_id";

/// A captured span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    #[serde(rename = "span_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "parent_span_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Position of the span in opening order, across all requests.
    pub sequence: u64,
    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanRecord {
    pub fn duration_nanos(&self) -> u128 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// A string attribute, if present.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

/// Shared storage of captured spans, keyed by request id.
#[derive(Debug, Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<RwLock<HashMap<String, Vec<SpanRecord>>>>,
}

impl SpanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The spans of one request in opening order.
    pub fn spans_for(&self, request_id: &str) -> Vec<SpanRecord> {
        let mut spans = self
            .spans
            .read()
            .ok()
            .and_then(|spans| spans.get(request_id).cloned())
            .unwrap_or_default();
        spans.sort_by_key(|s| s.sequence);
        spans
    }

    /// Every request id seen so far, sorted.
    pub fn request_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.spans.read().map(|spans| spans.keys().cloned().collect()).unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn record(&self, request_id: String, span: SpanRecord) {
        if let Ok(mut spans) = self.spans.write() {
            spans.entry(request_id).or_default().push(span);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut spans) = self.spans.write() {
            spans.clear();
        }
    }
}

/// A tracing layer that captures closed spans into a [`SpanRecorder`].
pub struct InMemorySpanLayer {
    recorder: SpanRecorder,
    sequence: AtomicU64,
}

impl InMemorySpanLayer {
    pub fn new(recorder: SpanRecorder) -> Self {
        Self { recorder, sequence: AtomicU64::new(0) }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

#[derive(Clone, Copy)]
struct Opened {
    sequence: u64,
    at: u128,
}

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for InMemorySpanLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for key in CONTEXT_KEYS {
                    if !fields.contains_key(*key) {
                        if let Some(value) = parent_fields.0.get(*key) {
                            fields.insert((*key).to_string(), value.clone());
                        }
                    }
                }
            }
        }

        let mut extensions = span.extensions_mut();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        extensions.insert(Opened { sequence, at: now_nanos() });
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();

        let fields = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();
        let Some(request_id) = fields.get(REQUEST_KEY).and_then(|v| v.as_str()).map(str::to_string)
        else {
            return;
        };
        let opened = extensions.get::<Opened>().copied().unwrap_or(Opened { sequence: 0, at: 0 });

        let record = SpanRecord {
            id: format!("{:016x}", id.into_u64()),
            name: span.metadata().name().to_string(),
            parent_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            sequence: opened.sequence,
            start_time: opened.at,
            end_time: now_nanos(),
            attributes: fields,
        };
        self.recorder.record(request_id, record);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
