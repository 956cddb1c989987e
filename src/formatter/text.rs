use super::{for_each_leaf, write_text_pair, write_text_str, Format, FormatOptions};
use crate::error::FormatError;
use crate::record::{Record, Value};

/// logfmt-style `key=value` pairs on a single line.
///
/// Values that contain spaces, `=`, quotes, backslashes or control
/// characters are double-quoted with JSON escaping, so a newline inside a
/// message is written as `\n` and never splits the record. Groups become
/// dotted key paths.
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    options: FormatOptions,
}

impl TextFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }
}

impl Format for TextFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(96 + record.message.len());

        out.extend_from_slice(b"time=");
        write_text_str(&mut out, &self.options.record_time(record))?;
        out.extend_from_slice(b" level=");
        out.extend_from_slice(record.level.as_str().as_bytes());
        out.extend_from_slice(b" msg=");
        write_text_str(&mut out, &record.message)?;

        if let Some(source) = &record.source {
            out.extend_from_slice(b" source=");
            write_text_str(&mut out, &source.to_string())?;
            if let (true, Some(function)) = (self.options.source_function, &source.function) {
                out.extend_from_slice(b" func=");
                write_text_str(&mut out, function)?;
            }
        }

        let prefix = record.groups.join(".");
        for_each_leaf(&prefix, &record.attrs, &mut |key: &str, value: &Value| {
            write_text_pair(&mut out, key, value, &self.options)
        })?;

        out.push(b'\n');
        Ok(out)
    }
}
