use std::fs::File;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::WriteError;
use crate::sink::Sink;

/// Wraps an already-open stream.
///
/// Closing is a no-op for stdout/stderr; a caller-supplied file is flushed and
/// dropped, after which writes fail with [`WriteError::Closed`].
#[derive(Debug)]
pub struct StreamWriter {
    target: Target,
}

#[derive(Debug)]
enum Target {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    File(Mutex<Option<File>>),
}

impl StreamWriter {
    pub fn stdout() -> Self {
        Self {
            target: Target::Stdout(io::stdout()),
        }
    }

    pub fn stderr() -> Self {
        Self {
            target: Target::Stderr(io::stderr()),
        }
    }

    pub fn from_file(file: File) -> Self {
        Self {
            target: Target::File(Mutex::new(Some(file))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.target {
            Target::Stdout(_) => "stdout",
            Target::Stderr(_) => "stderr",
            Target::File(_) => "file",
        }
    }
}

fn lock(file: &Mutex<Option<File>>) -> MutexGuard<'_, Option<File>> {
    file.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Sink for StreamWriter {
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        match &self.target {
            Target::Stdout(stdout) => {
                let mut out = stdout.lock();
                out.write_all(buf)?;
                out.flush()?;
            }
            Target::Stderr(stderr) => {
                let mut out = stderr.lock();
                out.write_all(buf)?;
            }
            Target::File(file) => {
                let mut guard = lock(file);
                let file = guard.as_mut().ok_or(WriteError::Closed)?;
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&self) -> Result<(), WriteError> {
        match &self.target {
            Target::Stdout(stdout) => stdout.lock().flush()?,
            Target::Stderr(stderr) => stderr.lock().flush()?,
            Target::File(file) => {
                if let Some(file) = lock(file).as_mut() {
                    file.flush()?;
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), WriteError> {
        match &self.target {
            Target::File(file) => {
                if let Some(mut file) = lock(file).take() {
                    file.flush()?;
                }
                Ok(())
            }
            _ => self.flush(),
        }
    }
}
