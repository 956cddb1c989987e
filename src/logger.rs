use crate::error::LogError;
use crate::formatter::{Format, Formatter};
use crate::record::{Level, Record};
use crate::sink::Sink;
use crate::writer::Writer;

/// An explicitly constructed logging handle: one formatter, one writer and a
/// minimum level.
///
/// There is no process-wide instance; share it as `Arc<Logger>` with whatever
/// needs to log, and call [`close`](Self::close) at shutdown.
#[derive(Debug)]
pub struct Logger {
    formatter: Formatter,
    writer: Writer,
    level: Level,
    add_source: bool,
}

impl Logger {
    pub fn new(formatter: Formatter, writer: Writer) -> Self {
        Self {
            formatter,
            writer,
            level: Level::Info,
            add_source: false,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Ask record producers to attach call sites.
    pub fn with_add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn add_source(&self) -> bool {
        self.add_source
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Format and write one record. Records below the configured level are
    /// skipped without error.
    pub fn log(&self, record: &Record) -> Result<(), LogError> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let bytes = self.formatter.format(record)?;
        self.writer.write(&bytes)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn close(&self) -> Result<(), LogError> {
        self.writer.close()?;
        Ok(())
    }
}
