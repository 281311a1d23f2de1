//! Destination over any `std::io::Write`

use crate::core::{Destination, Result};
use std::io::Write;

/// Adapts a writer (a socket, a pipe, a `Vec<u8>`) into a destination
pub struct WriterDestination<W: Write + Send> {
    writer: W,
    name: String,
}

impl<W: Write + Send> WriterDestination<W> {
    pub fn new(writer: W) -> Self {
        Self::named("writer", writer)
    }

    pub fn named(name: impl Into<String>, writer: W) -> Self {
        Self {
            writer,
            name: name.into(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Destination for WriterDestination<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
