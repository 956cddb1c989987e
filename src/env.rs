//! Environment variable names read by
//! [`LoggerConfig::from_env`](crate::config::LoggerConfig::from_env).
//!
//! These are purely helpers; formatters and writers never read the
//! environment themselves.

/// `1`/`true` selects the development preset, anything else production.
pub const IS_SANDBOX_ENV: &str = "IS_SANDBOX";

/// Minimum level: `DEBUG`, `INFO`, `WARN`, `ERROR`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Encoding: `json`, `text`, `color` (or `colored`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Comma-separated destinations: `stdout`, `stderr`, or file paths.
pub const LOG_OUTPUT_ENV: &str = "LOG_OUTPUT";

/// `true`/`1` to attach call sites to records.
pub const LOG_ADD_SOURCE_ENV: &str = "LOG_ADD_SOURCE";

/// Time layout selector, e.g. `datetime`, `rfc3339ms`, `unixms`.
pub const LOG_TIME_FORMAT_ENV: &str = "LOG_TIME_FORMAT";

/// IANA zone name; unknown names fall back to the local zone.
pub const LOG_TIMEZONE_ENV: &str = "LOG_TIMEZONE";

/// `true` (any case) and `1` are true, everything else is false.
pub fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
