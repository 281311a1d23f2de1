//! TCP destination for remote logging
//!
//! Sends encoded lines to a remote server over TCP. Useful for centralized
//! logging in distributed systems.

use crate::core::{Destination, LoggerError, Result};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination that streams lines to a TCP server
///
/// A failed write drops the connection and reports the error; the bytes of
/// that write are not resent. With reconnection enabled (the default) the
/// next write dials the server again.
///
/// # Example
///
/// ```no_run
/// use rust_structured_logger::destinations::TcpDestination;
/// use rust_structured_logger::prelude::*;
///
/// let destination = TcpDestination::new("127.0.0.1:8080")
///     .expect("Failed to connect to log server");
///
/// let logger = Logger::builder().destination(destination).build().unwrap();
/// logger.info("This log will be sent to 127.0.0.1:8080");
/// ```
pub struct TcpDestination {
    stream: Option<TcpStream>,
    address: String,
    reconnect_on_error: bool,
}

impl TcpDestination {
    /// Connect to `addr` (e.g. "localhost:8080", "192.168.1.1:9000")
    ///
    /// # Errors
    ///
    /// Returns error if connection fails
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let address = addr.into();
        let stream = Self::connect(&address)?;

        Ok(Self {
            stream: Some(stream),
            address,
            reconnect_on_error: true,
        })
    }

    /// Enable or disable reconnection on the next write after a failure
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect(address: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(address)
            .map_err(|e| LoggerError::io_operation("connecting to log server", address, e))?;

        // Set timeouts to prevent hanging
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;

        // Enable TCP_NODELAY for low-latency logging
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl Destination for TcpDestination {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.stream.is_none() && self.reconnect_on_error {
            self.stream = Some(Self::connect(&self.address)?);
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(LoggerError::destination("tcp", "stream not connected"));
        };

        if let Err(e) = stream.write_all(bytes) {
            // Connection lost
            self.stream = None;
            return Err(LoggerError::destination(
                "tcp",
                format!("write to {} failed: {}", self.address, e),
            ));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tcp"
    }

    fn reopen(&mut self) -> Result<()> {
        self.stream = Some(Self::connect(&self.address)?);
        Ok(())
    }
}

impl Drop for TcpDestination {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = TcpDestination::new(format!("127.0.0.1:{}", port));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_without_connection() {
        let mut destination = TcpDestination {
            stream: None,
            address: "127.0.0.1:9".to_string(),
            reconnect_on_error: false,
        };

        assert!(destination.write(b"test\n").is_err());
    }

    #[test]
    fn test_sends_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).unwrap();
            received
        });

        {
            let mut destination = TcpDestination::new(addr.to_string()).unwrap();
            destination.write(b"{\"msg\":\"remote\"}\n").unwrap();
            destination.flush().unwrap();
        }

        assert_eq!(server.join().unwrap(), "{\"msg\":\"remote\"}\n");
    }
}
