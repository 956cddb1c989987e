use std::sync::{Mutex, PoisonError};

use super::Writer;
use crate::error::{FanoutError, WriteError};
use crate::sink::Sink;

/// Delivers every record to each member in order.
///
/// A failing member never stops the others: every member sees every write
/// and close attempt, and the failures are reported together.
#[derive(Debug)]
pub struct MultiWriter {
    writers: Vec<Writer>,
    // keeps records in the same relative order on every member
    order: Mutex<()>,
}

impl MultiWriter {
    pub fn new(writers: Vec<Writer>) -> Self {
        Self {
            writers,
            order: Mutex::new(()),
        }
    }

    pub fn writers(&self) -> &[Writer] {
        &self.writers
    }

    fn each<F>(&self, mut op: F) -> Result<(), WriteError>
    where
        F: FnMut(&Writer) -> Result<(), WriteError>,
    {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let failures: Vec<(usize, WriteError)> = self
            .writers
            .iter()
            .enumerate()
            .filter_map(|(index, writer)| op(writer).err().map(|err| (index, err)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FanoutError {
                total: self.writers.len(),
                failures,
            }
            .into())
        }
    }
}

impl Sink for MultiWriter {
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        self.each(|writer| writer.write(buf).map(|_| ()))?;
        Ok(buf.len())
    }

    fn flush(&self) -> Result<(), WriteError> {
        self.each(|writer| writer.flush())
    }

    fn close(&self) -> Result<(), WriteError> {
        self.each(|writer| writer.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RotationPolicy;
    use std::fs;

    #[test]
    fn writes_reach_every_member() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let multi = MultiWriter::new(vec![
            Writer::rotating(&a, RotationPolicy::default()).unwrap(),
            Writer::rotating(&b, RotationPolicy::default()).unwrap(),
        ]);

        assert_eq!(multi.write(b"hello\n").unwrap(), 6);
        multi.close().unwrap();
        assert_eq!(fs::read_to_string(a).unwrap(), "hello\n");
        assert_eq!(fs::read_to_string(b).unwrap(), "hello\n");
    }

    #[test]
    fn failing_member_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Writer::rotating(dir.path().join("broken.log"), RotationPolicy::default()).unwrap();
        broken.close().unwrap();
        let healthy_path = dir.path().join("healthy.log");
        let multi = MultiWriter::new(vec![
            broken,
            Writer::rotating(&healthy_path, RotationPolicy::default()).unwrap(),
        ]);

        for line in ["first\n", "second\n"] {
            match multi.write(line.as_bytes()) {
                Err(WriteError::Fanout(err)) => {
                    assert_eq!(err.total, 2);
                    assert_eq!(err.failures.len(), 1);
                    assert_eq!(err.failures[0].0, 0);
                    assert!(matches!(err.failures[0].1, WriteError::Closed));
                }
                other => panic!("expected fan-out error, got {other:?}"),
            }
        }
        assert_eq!(fs::read_to_string(&healthy_path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn close_reaches_every_member() {
        let dir = tempfile::tempdir().unwrap();
        let first = Writer::rotating(dir.path().join("1.log"), RotationPolicy::default()).unwrap();
        let second = Writer::rotating(dir.path().join("2.log"), RotationPolicy::default()).unwrap();
        let multi = MultiWriter::new(vec![first, second]);

        multi.close().unwrap();
        for writer in multi.writers() {
            assert!(matches!(writer.write(b"x\n"), Err(WriteError::Closed)));
        }
    }
}
