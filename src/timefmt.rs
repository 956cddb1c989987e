//! Time layout selectors and timezone resolution shared by every formatter.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// How timestamps are rendered.
///
/// Parsing never fails: an empty selector selects [`TimeLayout::DateTime`],
/// unknown selectors are treated as chrono `strftime` templates, and a
/// template chrono rejects degrades to `DateTime` as well.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimeLayout {
    /// `HH:MM:SS`
    Time,
    /// `HH:MM:SS.mmm`
    TimeMs,
    /// `YYYY-MM-DD HH:MM:SS`
    #[default]
    DateTime,
    /// `YYYY-MM-DDTHH:MM:SSZ`, or with the zone offset outside UTC.
    Rfc3339,
    Rfc3339Ms,
    /// Integer seconds since the epoch.
    Unix,
    UnixMs,
    /// Seconds since the epoch with a millisecond fraction.
    UnixFloat,
    Custom(String),
}

impl TimeLayout {
    pub fn parse(selector: &str) -> Self {
        match selector.trim() {
            "" | "datetime" => TimeLayout::DateTime,
            "time" => TimeLayout::Time,
            "timems" => TimeLayout::TimeMs,
            "rfc3339" => TimeLayout::Rfc3339,
            "rfc3339ms" => TimeLayout::Rfc3339Ms,
            "unix" => TimeLayout::Unix,
            "unixms" => TimeLayout::UnixMs,
            "unixfloat" => TimeLayout::UnixFloat,
            _ if is_valid_template(selector) => TimeLayout::Custom(selector.to_string()),
            _ => TimeLayout::DateTime,
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            TimeLayout::Time => "time",
            TimeLayout::TimeMs => "timems",
            TimeLayout::DateTime => "datetime",
            TimeLayout::Rfc3339 => "rfc3339",
            TimeLayout::Rfc3339Ms => "rfc3339ms",
            TimeLayout::Unix => "unix",
            TimeLayout::UnixMs => "unixms",
            TimeLayout::UnixFloat => "unixfloat",
            TimeLayout::Custom(layout) => layout,
        }
    }

    /// Epoch layouts are emitted as bare numbers in JSON.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimeLayout::Unix | TimeLayout::UnixMs | TimeLayout::UnixFloat
        )
    }

    pub fn render<Z>(&self, t: &DateTime<Z>) -> String
    where
        Z: TimeZone,
        Z::Offset: fmt::Display,
    {
        match self {
            TimeLayout::Time => t.format("%H:%M:%S").to_string(),
            TimeLayout::TimeMs => t.format("%H:%M:%S%.3f").to_string(),
            TimeLayout::DateTime => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            TimeLayout::Rfc3339 => t.to_rfc3339_opts(SecondsFormat::Secs, true),
            TimeLayout::Rfc3339Ms => t.to_rfc3339_opts(SecondsFormat::Millis, true),
            TimeLayout::Unix => t.timestamp().to_string(),
            TimeLayout::UnixMs => t.timestamp_millis().to_string(),
            TimeLayout::UnixFloat => format!("{:.3}", t.timestamp_millis() as f64 / 1000.0),
            TimeLayout::Custom(layout) => {
                let mut out = String::new();
                match write!(out, "{}", t.format(layout)) {
                    Ok(()) => out,
                    Err(_) => TimeLayout::DateTime.render(t),
                }
            }
        }
    }
}

// chrono panics in `to_string` on templates it cannot parse, and on
// parse-only items such as `%#z`, so custom layouts are rendered once up front.
fn is_valid_template(layout: &str) -> bool {
    if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    let mut out = String::new();
    write!(out, "{}", DateTime::<Utc>::default().format(layout)).is_ok()
}

impl FromStr for TimeLayout {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TimeLayout::parse(s))
    }
}

impl From<String> for TimeLayout {
    fn from(value: String) -> Self {
        TimeLayout::parse(&value)
    }
}

impl From<TimeLayout> for String {
    fn from(value: TimeLayout) -> Self {
        value.selector().to_string()
    }
}

impl fmt::Display for TimeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

/// Zone in which timestamps are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timezone {
    /// The process's local zone.
    #[default]
    Local,
    Zone(Tz),
}

impl Timezone {
    /// Resolve a zone name. Empty, `local`, or unknown names resolve to
    /// [`Timezone::Local`]; this never fails.
    pub fn resolve(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("local") {
            return Timezone::Local;
        }
        name.parse::<Tz>().map(Timezone::Zone).unwrap_or(Timezone::Local)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Timezone::Local => "Local",
            Timezone::Zone(tz) => tz.name(),
        }
    }

    pub fn render(&self, t: DateTime<Utc>, layout: &TimeLayout) -> String {
        match self {
            Timezone::Local => layout.render(&t.with_timezone(&chrono::Local)),
            Timezone::Zone(tz) => layout.render(&t.with_timezone(tz)),
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn renders_every_selector() {
        let cases = [
            ("time", "10:30:45"),
            ("timems", "10:30:45.123"),
            ("datetime", "2024-01-15 10:30:45"),
            ("", "2024-01-15 10:30:45"),
            ("rfc3339", "2024-01-15T10:30:45Z"),
            ("rfc3339ms", "2024-01-15T10:30:45.123Z"),
            ("unix", "1705314645"),
            ("unixms", "1705314645123"),
            ("unixfloat", "1705314645.123"),
            ("%Y/%m/%d", "2024/01/15"),
        ];

        let utc = Timezone::resolve("UTC");
        for (selector, expected) in cases {
            let layout = TimeLayout::parse(selector);
            assert_eq!(utc.render(sample(), &layout), expected, "selector {selector:?}");
        }
    }

    #[test]
    fn rfc3339_uses_offset_outside_utc() {
        let shanghai = Timezone::resolve("Asia/Shanghai");
        assert_eq!(
            shanghai.render(sample(), &TimeLayout::Rfc3339),
            "2024-01-15T18:30:45+08:00"
        );
    }

    #[test]
    fn broken_template_falls_back_to_datetime() {
        assert_eq!(TimeLayout::parse("%Q%"), TimeLayout::DateTime);
        assert_eq!(
            TimeLayout::parse("%H"),
            TimeLayout::Custom("%H".to_string())
        );
    }

    #[test]
    fn parse_only_template_falls_back_to_datetime() {
        assert_eq!(TimeLayout::parse("%#z"), TimeLayout::DateTime);
        assert_eq!(TimeLayout::parse("at %H:%M %#z"), TimeLayout::DateTime);

        // a hand-built layout chrono cannot render degrades at render time
        let layout = TimeLayout::Custom("%#z".to_string());
        assert_eq!(
            Timezone::resolve("UTC").render(sample(), &layout),
            "2024-01-15 10:30:45"
        );
    }

    #[test]
    fn resolves_timezones_leniently() {
        assert_eq!(Timezone::resolve("UTC").name(), "UTC");
        assert_eq!(Timezone::resolve("Asia/Shanghai").name(), "Asia/Shanghai");
        assert_eq!(Timezone::resolve(""), Timezone::Local);
        assert_eq!(Timezone::resolve("local"), Timezone::Local);
        assert_eq!(Timezone::resolve("Nowhere/Fake"), Timezone::Local);
    }

    #[test]
    fn zero_time_renders() {
        let zero = DateTime::<Utc>::default();
        let rendered = Timezone::resolve("UTC").render(zero, &TimeLayout::DateTime);
        assert_eq!(rendered, "1970-01-01 00:00:00");
        // local rendering of the sentinel must not panic either
        let _ = Timezone::Local.render(zero, &TimeLayout::Rfc3339Ms);
    }

    #[test]
    fn layout_round_trips_through_serde() {
        let layout: TimeLayout = serde_json::from_str("\"rfc3339ms\"").unwrap();
        assert_eq!(layout, TimeLayout::Rfc3339Ms);
        assert_eq!(serde_json::to_string(&layout).unwrap(), "\"rfc3339ms\"");
    }
}
