use crate::error::WriteError;

/// Destination for formatted records.
///
/// Implementations serialize their own `write` calls: the bytes passed to a
/// single call land contiguously and are never interleaved with another
/// caller's bytes. Lock scope is limited to the implementation's own write
/// (and, for rotating files, the rotation that precedes it).
pub trait Sink: Send + Sync {
    /// Deliver one formatted record.
    ///
    /// **Returns**
    /// - `Ok(n)` with the number of bytes accepted (always `buf.len()` on
    ///   success).
    /// - `Err(..)` if the underlying stream failed or the sink is closed.
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError>;

    /// Flush any bytes buffered by the sink or the OS stream wrapper.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> Result<(), WriteError> {
        Ok(())
    }

    /// Release the underlying resource. Writes after `close` fail with
    /// [`WriteError::Closed`] for sinks that own a resource; closing twice is
    /// not an error.
    fn close(&self) -> Result<(), WriteError>;
}
