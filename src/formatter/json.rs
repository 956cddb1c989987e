use std::io::Write;

use super::{Format, FormatOptions};
use crate::error::FormatError;
use crate::record::{Attr, Record, Value};

/// One JSON object per line with keys in the order `time`, `level`,
/// `source`, `msg`, then attributes. Open groups become nested objects.
///
/// Non-finite floats are written as `null`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    options: FormatOptions,
}

impl JsonFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    fn write_value(&self, out: &mut Vec<u8>, value: &Value) -> Result<(), FormatError> {
        match value {
            Value::String(s) => serde_json::to_writer(&mut *out, s.as_str())?,
            Value::Int(n) => write!(out, "{n}")?,
            Value::Uint(n) => write!(out, "{n}")?,
            Value::Float(f) if f.is_finite() => serde_json::to_writer(&mut *out, f)?,
            Value::Float(_) => out.extend_from_slice(b"null"),
            Value::Bool(b) => write!(out, "{b}")?,
            Value::Duration(d) => write!(out, "{}", d.as_nanos())?,
            Value::Time(t) => serde_json::to_writer(&mut *out, &self.options.attr_time(*t))?,
            Value::Group(attrs) => {
                out.push(b'{');
                let mut first = true;
                self.write_attrs(out, attrs, &mut first)?;
                out.push(b'}');
            }
        }
        Ok(())
    }

    /// Append `attrs` as members of the currently open object. `first`
    /// tracks whether a separator is needed before the next member.
    fn write_attrs(&self, out: &mut Vec<u8>, attrs: &[Attr], first: &mut bool) -> Result<(), FormatError> {
        for attr in attrs.iter().filter(|a| a.is_visible()) {
            if let Value::Group(members) = &attr.value {
                if attr.key.is_empty() {
                    self.write_attrs(out, members, first)?;
                    continue;
                }
            }
            if !std::mem::take(first) {
                out.push(b',');
            }
            serde_json::to_writer(&mut *out, attr.key.as_str())?;
            out.push(b':');
            self.write_value(out, &attr.value)?;
        }
        Ok(())
    }
}

impl Format for JsonFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(128 + record.message.len());

        out.extend_from_slice(b"{\"time\":");
        let time = self.options.record_time(record);
        if self.options.time_layout.is_numeric() {
            out.extend_from_slice(time.as_bytes());
        } else {
            serde_json::to_writer(&mut out, &time)?;
        }

        out.extend_from_slice(b",\"level\":");
        serde_json::to_writer(&mut out, record.level.as_str())?;

        if let Some(source) = &record.source {
            out.extend_from_slice(b",\"source\":");
            serde_json::to_writer(&mut out, &source.to_string())?;
            if let (true, Some(function)) = (self.options.source_function, &source.function) {
                out.extend_from_slice(b",\"func\":");
                serde_json::to_writer(&mut out, function.as_str())?;
            }
        }

        out.extend_from_slice(b",\"msg\":");
        serde_json::to_writer(&mut out, record.message.as_str())?;

        if record.has_visible_attrs() {
            for group in &record.groups {
                out.push(b',');
                serde_json::to_writer(&mut out, group.as_str())?;
                out.extend_from_slice(b":{");
            }
            // inside a freshly opened group object no separator is needed
            let mut first = !record.groups.is_empty();
            self.write_attrs(&mut out, &record.attrs, &mut first)?;
            out.extend(std::iter::repeat(b'}').take(record.groups.len()));
        }

        out.extend_from_slice(b"}\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, Source};
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap()
    }

    fn utc() -> JsonFormatter {
        JsonFormatter::new(FormatOptions::new().with_timezone("UTC"))
    }

    fn render(f: &JsonFormatter, record: &Record) -> String {
        String::from_utf8(f.format(record).unwrap()).unwrap()
    }

    #[test]
    fn basic_record_is_valid_json() {
        let record = Record::new(test_time(), Level::Info, "test message");
        let output = render(&utc(), &record);

        assert!(output.ends_with("}\n"));
        assert_eq!(output.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["msg"], "test message");
        assert_eq!(parsed["time"], "2024-01-15 10:30:45");
    }

    #[test]
    fn top_level_key_order_is_fixed() {
        let record = Record::new(test_time(), Level::Warn, "m")
            .with_attr("a", 1)
            .with_source(Source::new("/app/main.rs", 42));
        assert_eq!(
            render(&utc(), &record),
            "{\"time\":\"2024-01-15 10:30:45\",\"level\":\"WARN\",\"source\":\"/app/main.rs:42\",\"msg\":\"m\",\"a\":1}\n"
        );
    }

    #[test]
    fn typed_attributes() {
        let record = Record::new(test_time(), Level::Info, "test")
            .with_attr("key", "value")
            .with_attr("count", 42)
            .with_attr("big", u64::MAX)
            .with_attr("ratio", 0.5)
            .with_attr("enabled", true)
            .with_attr("elapsed", Duration::from_millis(1500))
            .with_attr("at", test_time());
        let output = render(&utc(), &record);

        assert!(output.contains("\"key\":\"value\""));
        assert!(output.contains("\"count\":42"));
        assert!(output.contains("\"big\":18446744073709551615"));
        assert!(output.contains("\"ratio\":0.5"));
        assert!(output.contains("\"enabled\":true"));
        assert!(output.contains("\"elapsed\":1500000000"));
        assert!(output.contains("\"at\":\"2024-01-15T10:30:45.000Z\""));
    }

    #[test]
    fn duplicate_keys_are_preserved_in_order() {
        let record = Record::new(test_time(), Level::Info, "m")
            .with_attr("k", 1)
            .with_attr("k", 2);
        assert!(render(&utc(), &record).ends_with(",\"k\":1,\"k\":2}\n"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        let record = Record::new(test_time(), Level::Info, "m")
            .with_attr("nan", f64::NAN)
            .with_attr("inf", f64::INFINITY);
        let output = render(&utc(), &record);
        assert!(output.contains("\"nan\":null"));
        assert!(output.contains("\"inf\":null"));
        serde_json::from_str::<serde_json::Value>(&output).unwrap();
    }

    #[test]
    fn open_groups_nest_attributes() {
        let record = Record::new(test_time(), Level::Info, "test")
            .with_group("request")
            .with_group("headers")
            .with_attr("method", "GET");
        let output = render(&utc(), &record);
        assert!(output.contains("\"request\":{\"headers\":{\"method\":\"GET\"}}"));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["request"]["headers"]["method"], "GET");
    }

    #[test]
    fn open_group_without_attrs_is_omitted() {
        let record = Record::new(test_time(), Level::Info, "test").with_group("request");
        assert!(!render(&utc(), &record).contains("request"));
    }

    #[test]
    fn group_values_nest_and_empty_keys_inline() {
        let record = Record::new(test_time(), Level::Info, "m").with_attrs([
            Attr::group("user", vec![Attr::new("id", 7), Attr::new("name", "bob")]),
            Attr::group("", vec![Attr::new("flat", true)]),
            Attr::group("nothing", vec![]),
        ]);
        let output = render(&utc(), &record);
        assert!(output.contains(",\"user\":{\"id\":7,\"name\":\"bob\"},\"flat\":true}"));
        assert!(!output.contains("nothing"));
    }

    #[test]
    fn escapes_special_characters() {
        let message = "message with \"quotes\" and \\backslash\nnewline";
        let record = Record::new(test_time(), Level::Info, message).with_attr("ctl", "\u{1b}[0m");
        let output = render(&utc(), &record);

        assert!(output.contains("\\\"quotes\\\""));
        assert!(output.contains("\\\\backslash"));
        assert_eq!(output.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["msg"], message);
        assert_eq!(parsed["ctl"], "\u{1b}[0m");
    }

    #[test]
    fn unix_layouts_are_numbers() {
        let f = JsonFormatter::new(FormatOptions::new().with_time_format("unixms"));
        let output = render(&f, &Record::new(test_time(), Level::Info, "m"));
        assert!(output.starts_with("{\"time\":1705314645000,"));
    }

    #[test]
    fn rfc3339_in_utc() {
        let f = JsonFormatter::new(
            FormatOptions::new()
                .with_time_format("rfc3339")
                .with_timezone("UTC"),
        );
        let output = render(&f, &Record::new(test_time(), Level::Info, "m"));
        assert!(output.contains("\"time\":\"2024-01-15T10:30:45Z\""));
    }

    #[test]
    fn function_is_opt_in() {
        let record = Record::new(test_time(), Level::Info, "m")
            .with_source(Source::new("/app/main.rs", 42).with_function("app::handler"));
        assert!(!render(&utc(), &record).contains("func"));

        let f = JsonFormatter::new(FormatOptions::new().with_source_function(true));
        assert!(render(&f, &record).contains("\"source\":\"/app/main.rs:42\",\"func\":\"app::handler\""));
    }

    #[test]
    fn levels_render_by_name() {
        for (level, expected) in [
            (Level::Debug, "\"level\":\"DEBUG\""),
            (Level::Info, "\"level\":\"INFO\""),
            (Level::Warn, "\"level\":\"WARN\""),
            (Level::Error, "\"level\":\"ERROR\""),
        ] {
            let output = render(&utc(), &Record::new(test_time(), level, "m"));
            assert!(output.contains(expected));
        }
    }

    #[test]
    fn formatting_is_idempotent() {
        let record = Record::new(test_time(), Level::Error, "boom")
            .with_group("g")
            .with_attr("k", "v");
        let f = utc();
        assert_eq!(f.format(&record).unwrap(), f.format(&record).unwrap());
    }
}
