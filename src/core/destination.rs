//! Destination trait for encoded log output

use super::error::Result;

/// Byte sink at the end of the pipeline
///
/// A destination receives whole lines, possibly several concatenated in one
/// call. It is owned by a single [`DestinationSink`](super::sink::DestinationSink)
/// and is never called concurrently.
pub trait Destination: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Close and reopen the underlying resource, e.g. after log rotation
    fn reopen(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn reopen(&mut self) -> Result<()> {
        (**self).reopen()
    }
}
