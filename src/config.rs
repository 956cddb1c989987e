use serde::{Deserialize, Serialize};

use crate::env::{
    parse_bool, IS_SANDBOX_ENV, LOG_ADD_SOURCE_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV, LOG_OUTPUT_ENV,
    LOG_TIMEZONE_ENV, LOG_TIME_FORMAT_ENV,
};
use crate::error::WriteError;
use crate::formatter::{ColorFormatter, FormatKind, FormatOptions, Formatter};
use crate::logger::Logger;
use crate::record::Level;
use crate::timefmt::{TimeLayout, Timezone};
use crate::writer::{RotationPolicy, Writer};

/// Declarative description of a [`Logger`].
///
/// **Fields**
/// - `level`: minimum level written.
/// - `format`: `json`, `text` or `color`.
/// - `outputs`: destinations (`stdout`, `stderr` or file paths); more than
///   one produces a fan-out writer.
/// - `add_source`: attach call sites to records.
/// - `time_format` / `timezone`: passed to the formatter; both degrade to
///   defaults instead of failing.
/// - `ansi`: escape codes for the color formatter.
/// - `rotation`: policy for every file output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: Level,
    pub format: FormatKind,
    pub outputs: Vec<String>,
    pub add_source: bool,
    pub time_format: TimeLayout,
    pub timezone: String,
    pub ansi: bool,
    pub rotation: RotationPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: FormatKind::Color,
            outputs: vec!["stdout".to_string()],
            add_source: true,
            time_format: TimeLayout::DateTime,
            timezone: String::new(),
            ansi: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl LoggerConfig {
    /// Colored console output at DEBUG with call sites and a short clock.
    pub fn development() -> Self {
        Self {
            level: Level::Debug,
            format: FormatKind::Color,
            add_source: true,
            time_format: TimeLayout::Time,
            ..Self::default()
        }
    }

    /// JSON on stdout at INFO, UTC timestamps with milliseconds.
    pub fn production() -> Self {
        Self {
            level: Level::Info,
            format: FormatKind::Json,
            add_source: false,
            time_format: TimeLayout::Rfc3339Ms,
            timezone: "UTC".to_string(),
            ansi: false,
            ..Self::default()
        }
    }

    /// [`production`](Self::production) plus a rotating file.
    pub fn production_with_file(path: impl Into<String>) -> Self {
        Self {
            outputs: vec!["stdout".to_string(), path.into()],
            ..Self::production()
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// See [`crate::env`] for the variables consulted.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable
    /// source. Empty or unparseable values leave the preset untouched.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = if get(IS_SANDBOX_ENV).is_some_and(|v| parse_bool(&v)) {
            Self::development()
        } else {
            Self::production()
        };

        if let Some(level) = get(LOG_LEVEL_ENV).and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = get(LOG_FORMAT_ENV).and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Some(output) = get(LOG_OUTPUT_ENV) {
            config.outputs = output
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(add_source) = get(LOG_ADD_SOURCE_ENV) {
            config.add_source = parse_bool(&add_source);
        }
        if let Some(time_format) = get(LOG_TIME_FORMAT_ENV) {
            config.time_format = TimeLayout::parse(&time_format);
        }
        if let Some(timezone) = get(LOG_TIMEZONE_ENV) {
            config.timezone = timezone;
        }
        config
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            time_layout: self.time_format.clone(),
            timezone: Timezone::resolve(&self.timezone),
            source_function: false,
        }
    }

    pub fn formatter(&self) -> Formatter {
        match self.format {
            FormatKind::Color => ColorFormatter::new(self.format_options())
                .with_ansi(self.ansi)
                .into(),
            kind => Formatter::from_kind(kind, self.format_options()),
        }
    }

    /// Open every output. No outputs means stdout.
    pub fn writer(&self) -> Result<Writer, WriteError> {
        match self.outputs.as_slice() {
            [] => Ok(Writer::stdout()),
            [single] => Writer::open(single, self.rotation.clone()),
            many => {
                let writers = many
                    .iter()
                    .map(|destination| Writer::open(destination, self.rotation.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Writer::multi(writers))
            }
        }
    }

    pub fn build(&self) -> Result<Logger, WriteError> {
        Ok(Logger::new(self.formatter(), self.writer()?)
            .with_level(self.level)
            .with_add_source(self.add_source))
    }
}
