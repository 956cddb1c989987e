//! Encoders from [`Record`] to bytes.
//!
//! Every formatter is a pure function of the record and its construction-time
//! [`FormatOptions`]; none of them hold mutable state, so a single instance can
//! be shared across threads without locking. Output always ends with exactly
//! one `\n`.

mod color;
mod json;
mod text;

pub use color::ColorFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FormatError;
use crate::record::{Attr, Record, Value};
use crate::timefmt::{TimeLayout, Timezone};

/// Capability shared by every encoding.
pub trait Format: Send + Sync {
    /// Encode one record, including the trailing line terminator.
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError>;
}

/// Per-formatter configuration, fixed at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub time_layout: TimeLayout,
    pub timezone: Timezone,
    /// Also emit the call-site function when a record carries one.
    pub source_function: bool,
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_format(mut self, selector: &str) -> Self {
        self.time_layout = TimeLayout::parse(selector);
        self
    }

    /// Unknown zone names fall back to the local zone.
    pub fn with_timezone(mut self, name: &str) -> Self {
        self.timezone = Timezone::resolve(name);
        self
    }

    pub fn with_source_function(mut self, enabled: bool) -> Self {
        self.source_function = enabled;
        self
    }

    pub(crate) fn record_time(&self, record: &Record) -> String {
        self.timezone.render(record.time, &self.time_layout)
    }

    // Attribute times ignore the configured layout so they stay sortable.
    pub(crate) fn attr_time(&self, t: chrono::DateTime<chrono::Utc>) -> String {
        self.timezone.render(t, &TimeLayout::Rfc3339Ms)
    }
}

/// Selector for the closed set of encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Json,
    Text,
    #[default]
    #[serde(alias = "colored")]
    Color,
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(FormatKind::Json),
            "text" => Ok(FormatKind::Text),
            "color" | "colored" => Ok(FormatKind::Color),
            other => Err(format!("unknown log format: {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Formatter {
    Json(JsonFormatter),
    Text(TextFormatter),
    Color(ColorFormatter),
}

impl Formatter {
    pub fn json() -> Self {
        Formatter::Json(JsonFormatter::default())
    }

    pub fn text() -> Self {
        Formatter::Text(TextFormatter::default())
    }

    pub fn color() -> Self {
        Formatter::Color(ColorFormatter::default())
    }

    pub fn from_kind(kind: FormatKind, options: FormatOptions) -> Self {
        match kind {
            FormatKind::Json => Formatter::Json(JsonFormatter::new(options)),
            FormatKind::Text => Formatter::Text(TextFormatter::new(options)),
            FormatKind::Color => Formatter::Color(ColorFormatter::new(options)),
        }
    }

    pub fn kind(&self) -> FormatKind {
        match self {
            Formatter::Json(_) => FormatKind::Json,
            Formatter::Text(_) => FormatKind::Text,
            Formatter::Color(_) => FormatKind::Color,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        match self {
            Formatter::Json(f) => f.options(),
            Formatter::Text(f) => f.options(),
            Formatter::Color(f) => f.options(),
        }
    }
}

impl Format for Formatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        match self {
            Formatter::Json(f) => f.format(record),
            Formatter::Text(f) => f.format(record),
            Formatter::Color(f) => f.format(record),
        }
    }
}

impl From<JsonFormatter> for Formatter {
    fn from(value: JsonFormatter) -> Self {
        Formatter::Json(value)
    }
}

impl From<TextFormatter> for Formatter {
    fn from(value: TextFormatter) -> Self {
        Formatter::Text(value)
    }
}

impl From<ColorFormatter> for Formatter {
    fn from(value: ColorFormatter) -> Self {
        Formatter::Color(value)
    }
}

/// Visit every non-group attribute with its dotted path.
pub(crate) fn for_each_leaf<F>(prefix: &str, attrs: &[Attr], visit: &mut F) -> Result<(), FormatError>
where
    F: FnMut(&str, &Value) -> Result<(), FormatError>,
{
    for attr in attrs {
        let path = join_key(prefix, &attr.key);
        match &attr.value {
            Value::Group(members) => for_each_leaf(&path, members, visit)?,
            value => visit(&path, value)?,
        }
    }
    Ok(())
}

pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{key}"),
    }
}

pub(crate) fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars().any(|c| {
            c == ' ' || c == '=' || c == '"' || c == '\\' || c.is_whitespace() || c.is_control()
        })
}

/// Write a text-encoded string: bare when safe, otherwise as an escaped,
/// double-quoted string that re-parses as a JSON string literal.
pub(crate) fn write_text_str(out: &mut Vec<u8>, s: &str) -> Result<(), FormatError> {
    if needs_quoting(s) {
        serde_json::to_writer(&mut *out, s)?;
    } else {
        out.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

pub(crate) fn write_text_value(
    out: &mut Vec<u8>,
    value: &Value,
    options: &FormatOptions,
) -> Result<(), FormatError> {
    use std::io::Write;

    match value {
        Value::String(s) => write_text_str(out, s)?,
        Value::Int(n) => write!(out, "{n}")?,
        Value::Uint(n) => write!(out, "{n}")?,
        Value::Float(f) => out.extend_from_slice(text_float(*f).as_bytes()),
        Value::Bool(b) => write!(out, "{b}")?,
        Value::Duration(d) => write_text_str(out, &format!("{d:?}"))?,
        Value::Time(t) => write_text_str(out, &options.attr_time(*t))?,
        // groups are flattened by `for_each_leaf` before reaching here
        Value::Group(_) => {}
    }
    Ok(())
}

fn text_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "+Inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        f.to_string()
    }
}

/// Write a key/value pair in text encoding, preceded by a space.
pub(crate) fn write_text_pair(
    out: &mut Vec<u8>,
    key: &str,
    value: &Value,
    options: &FormatOptions,
) -> Result<(), FormatError> {
    out.push(b' ');
    write_text_str(out, key)?;
    out.push(b'=');
    write_text_value(out, value, options)
}
