//! Console destination implementation

use crate::core::{Destination, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Standard stream a [`ConsoleDestination`] writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

pub struct ConsoleDestination {
    target: ConsoleTarget,
}

impl ConsoleDestination {
    pub fn new() -> Self {
        Self::with_target(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::with_target(ConsoleTarget::Stderr)
    }

    pub fn with_target(target: ConsoleTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }
}

impl Default for ConsoleDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl Destination for ConsoleDestination {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        // Holding the stream lock keeps the batch contiguous.
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(bytes)?,
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(bytes)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_names() {
        assert_eq!(ConsoleDestination::new().name(), "stdout");
        assert_eq!(ConsoleDestination::stderr().name(), "stderr");
    }

    #[test]
    fn test_target_serde() {
        let target: ConsoleTarget = serde_json::from_str("\"stderr\"").unwrap();
        assert_eq!(target, ConsoleTarget::Stderr);
    }
}
