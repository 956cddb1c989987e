//! Sinks for formatted records.

mod multi;
mod rotating;
mod stream;

pub use multi::MultiWriter;
pub use rotating::{RotatingFileWriter, RotationFallback, RotationPolicy};
pub use stream::StreamWriter;

use std::fs::File;
use std::path::PathBuf;

use crate::error::WriteError;
use crate::sink::Sink;

/// The closed set of sinks.
#[derive(Debug)]
pub enum Writer {
    Stream(StreamWriter),
    File(RotatingFileWriter),
    Multi(MultiWriter),
}

impl Writer {
    pub fn stdout() -> Self {
        Writer::Stream(StreamWriter::stdout())
    }

    pub fn stderr() -> Self {
        Writer::Stream(StreamWriter::stderr())
    }

    /// Wrap a caller-supplied handle; `close` drops it.
    pub fn from_file(file: File) -> Self {
        Writer::Stream(StreamWriter::from_file(file))
    }

    pub fn rotating(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self, WriteError> {
        RotatingFileWriter::new(path, policy).map(Writer::File)
    }

    pub fn multi(writers: Vec<Writer>) -> Self {
        Writer::Multi(MultiWriter::new(writers))
    }

    /// Open a destination string: `stdout`, `stderr`, or a file path that
    /// becomes a rotating file governed by `policy`.
    pub fn open(destination: &str, policy: RotationPolicy) -> Result<Self, WriteError> {
        let destination = destination.trim();
        if destination.eq_ignore_ascii_case("stdout") {
            Ok(Writer::stdout())
        } else if destination.eq_ignore_ascii_case("stderr") {
            Ok(Writer::stderr())
        } else {
            Writer::rotating(destination, policy)
        }
    }
}

impl Sink for Writer {
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        match self {
            Writer::Stream(w) => w.write(buf),
            Writer::File(w) => w.write(buf),
            Writer::Multi(w) => w.write(buf),
        }
    }

    fn flush(&self) -> Result<(), WriteError> {
        match self {
            Writer::Stream(w) => w.flush(),
            Writer::File(w) => w.flush(),
            Writer::Multi(w) => w.flush(),
        }
    }

    fn close(&self) -> Result<(), WriteError> {
        match self {
            Writer::Stream(w) => w.close(),
            Writer::File(w) => w.close(),
            Writer::Multi(w) => w.close(),
        }
    }
}

impl From<StreamWriter> for Writer {
    fn from(value: StreamWriter) -> Self {
        Writer::Stream(value)
    }
}

impl From<RotatingFileWriter> for Writer {
    fn from(value: RotatingFileWriter) -> Self {
        Writer::File(value)
    }
}

impl From<MultiWriter> for Writer {
    fn from(value: MultiWriter) -> Self {
        Writer::Multi(value)
    }
}
