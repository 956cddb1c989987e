use serde_json::Map;
use std::borrow::Cow;

use super::{for_each_leaf, join_key, write_text_pair, write_text_str, Format, FormatOptions};
use crate::error::FormatError;
use crate::record::{Level, Record, Value};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";

/// Console output: colored level tag, dimmed timestamp, message, source and
/// `key=value` attributes.
///
/// String attributes holding a JSON object are expanded into dotted
/// sub-keys (`data={"a":1}` prints as `data.a=1`).
#[derive(Debug, Clone)]
pub struct ColorFormatter {
    options: FormatOptions,
    ansi: bool,
}

impl Default for ColorFormatter {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

impl ColorFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options, ansi: true }
    }

    /// Disable escape codes, e.g. when the destination is not a terminal.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    fn level_color(level: Level) -> &'static str {
        match level {
            Level::Debug => "\x1b[90m",
            Level::Info => "\x1b[34m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
        }
    }

    fn paint(&self, out: &mut Vec<u8>, color: &str, text: &str) {
        if self.ansi {
            out.extend_from_slice(color.as_bytes());
            out.extend_from_slice(text.as_bytes());
            out.extend_from_slice(RESET.as_bytes());
        } else {
            out.extend_from_slice(text.as_bytes());
        }
    }

    fn write_attr(&self, out: &mut Vec<u8>, key: &str, value: &Value) -> Result<(), FormatError> {
        if let Value::String(s) = value {
            if let Some(object) = parse_object(s) {
                if !object.is_empty() {
                    return write_json_object(out, key, &object);
                }
            }
        }
        write_text_pair(out, key, value, &self.options)
    }
}

fn parse_object(s: &str) -> Option<Map<String, serde_json::Value>> {
    if !s.trim_start().starts_with('{') {
        return None;
    }
    match serde_json::from_str(s) {
        Ok(serde_json::Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn write_json_object(
    out: &mut Vec<u8>,
    prefix: &str,
    object: &Map<String, serde_json::Value>,
) -> Result<(), FormatError> {
    for (key, value) in object {
        let path = join_key(prefix, key);
        match value {
            serde_json::Value::Object(inner) if !inner.is_empty() => {
                write_json_object(out, &path, inner)?;
            }
            serde_json::Value::String(s) => write_json_leaf(out, &path, s)?,
            other => write_json_leaf(out, &path, &other.to_string())?,
        }
    }
    Ok(())
}

fn write_json_leaf(out: &mut Vec<u8>, key: &str, value: &str) -> Result<(), FormatError> {
    out.push(b' ');
    write_text_str(out, key)?;
    out.push(b'=');
    write_text_str(out, value)
}

/// The message is printed bare, but control characters are escaped: line
/// breaks would split the record and escape sequences would reach the
/// terminal.
fn escape_controls(message: &str) -> Cow<'_, str> {
    if !message.chars().any(char::is_control) {
        return Cow::Borrowed(message);
    }
    let mut out = String::with_capacity(message.len() + 8);
    for c in message.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

impl Format for ColorFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(128 + record.message.len());

        self.paint(
            &mut out,
            Self::level_color(record.level),
            &format!("{:<5}", record.level.as_str()),
        );
        out.push(b' ');
        self.paint(&mut out, DIM, &self.options.record_time(record));
        out.push(b' ');

        self.paint(&mut out, BOLD, &escape_controls(&record.message));

        if let Some(source) = &record.source {
            out.push(b' ');
            let location = match (self.options.source_function, &source.function) {
                (true, Some(function)) => format!("{source} {function}"),
                _ => source.to_string(),
            };
            self.paint(&mut out, DIM, &location);
        }

        let prefix = record.groups.join(".");
        for_each_leaf(&prefix, &record.attrs, &mut |key: &str, value: &Value| {
            self.write_attr(&mut out, key, value)
        })?;

        out.push(b'\n');
        Ok(out)
    }
}
