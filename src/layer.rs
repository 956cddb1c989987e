use crate::formatter::{Format, TextFormatter};
use crate::logger::Logger;
use crate::record::{Attr, Level, Record, Source, Value};
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`Record`]s and hands
/// them to a [`Logger`].
///
/// Events emitted by this crate itself (rotation warnings and the like) never
/// reach the logger, so a failing writer cannot feed back into itself. Those
/// at `WARN` and above are printed to stderr instead.
pub struct RecordLayer {
    logger: Arc<Logger>,
    span_groups: bool,
    /// Internal events printed to stderr.
    pub internal_events: Arc<AtomicU64>,
}

impl RecordLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            span_groups: false,
            internal_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open one group per entered span, root first, so that
    /// `info_span!("request")` nests the event's fields under `request`.
    pub fn with_span_groups(mut self, enabled: bool) -> Self {
        self.span_groups = enabled;
        self
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    fn report_internal(&self, event: &Event<'_>) {
        let meta = event.metadata();
        if *meta.level() > tracing::Level::WARN {
            return;
        }
        let record = event_record(event, Level::from(meta.level())).with_attr("target", meta.target());
        match TextFormatter::default().format(&record) {
            Ok(line) => eprint!("{}", String::from_utf8_lossy(&line)),
            Err(e) => eprintln!("error formatting internal log event: {}", e),
        }
        self.internal_events.fetch_add(1, Ordering::Relaxed);
    }
}

fn event_record(event: &Event<'_>, level: Level) -> Record {
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);
    Record::new(Utc::now(), level, visitor.message.unwrap_or_default()).with_attrs(visitor.attrs)
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(env!("CARGO_CRATE_NAME"))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl<S> Layer<S> for RecordLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) {
            self.report_internal(event);
            return;
        }
        let level = Level::from(meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut record = event_record(event, level);

        if self.span_groups {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope.from_root() {
                    record = record.with_group(span.name());
                }
            }
        }

        if self.logger.add_source() {
            if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
                let mut source = Source::new(file, line);
                if let Some(module) = meta.module_path() {
                    source = source.with_function(module);
                }
                record = record.with_source(source);
            }
        }

        if let Err(e) = self.logger.log(&record) {
            eprintln!("error writing log record: {}", e);
        }
    }
}

/// Collects event fields in emission order. The `message` field becomes the
/// record message, everything else an attribute.
#[derive(Default)]
pub struct FieldVisitor {
    pub message: Option<String>,
    pub attrs: Vec<Attr>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        self.attrs.push(Attr::new(field.name(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::Uint(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, Value::String(format!("{:?}", value)));
        }
    }
}
