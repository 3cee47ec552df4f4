//! JSONL tracing layer.
//!
//! Writes one JSON object per event to stderr, keeping stdout for command
//! payloads. `run_id` and `stage` are taken from the innermost enclosing
//! span that recorded them.

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::{Level, LogEvent, Stage};

/// Correlation fields stored in span extensions.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    stage: Option<Stage>,
}

impl Visit for SpanContext {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "run_id" => self.run_id = Some(value.to_string()),
            "stage" => self.stage = Stage::parse(value),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        match field.name() {
            "run_id" => self.run_id = Some(rendered),
            "stage" => self.stage = Stage::parse(&rendered),
            _ => {}
        }
    }
}

/// Records event fields straight onto a [`LogEvent`].
struct FieldCollector(LogEvent);

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.message = Some(value.to_string());
        } else {
            self.0.set_field(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.0.message = Some(rendered);
        } else {
            self.0.set_field(field.name(), rendered);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.set_field(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.set_field(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN/inf have no JSON number form; keep them readable.
        if value.is_finite() {
            self.0.set_field(field.name(), value);
        } else {
            self.0.set_field(field.name(), value.to_string());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.set_field(field.name(), value);
    }
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        JsonlLayer::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Layer writing to a custom sink.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut span_ctx = SpanContext::default();
        attrs.record(&mut span_ctx);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(span_ctx);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut run_id = None;
        let mut stage = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if run_id.is_none() {
                        run_id.clone_from(&span_ctx.run_id);
                    }
                    if stage.is_none() {
                        stage = span_ctx.stage;
                    }
                }
            }
        }

        let metadata = event.metadata();
        let mut line = LogEvent::new(Level::from(*metadata.level()), metadata.target());
        line.run_id = run_id;
        line.stage = stage;
        let mut collector = FieldCollector(line);
        event.record(&mut collector);

        let line = collector.0.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}
