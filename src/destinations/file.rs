//! File destination implementation

use crate::core::{Destination, LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How a log file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Append to an existing file instead of truncating it
    pub append: bool,
    /// Create missing parent directories
    pub mkdir: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            append: true,
            mkdir: false,
        }
    }
}

pub struct FileDestination {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileDestination {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(path, FileOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: FileOptions) -> Result<Self> {
        let path = path.into();
        if options.mkdir {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
        }
        let file = Self::open(&path, options.append)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path, append: bool) -> Result<File> {
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options.open(path).map_err(|e| {
            LoggerError::io_operation("opening log file", path.display().to_string(), e)
        })
    }
}

impl Destination for FileDestination {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::destination("file", "file writer not open"))?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }

    /// Reopen the same path in append mode
    ///
    /// Used after an external tool renamed the file away.
    fn reopen(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        let file = Self::open(&self.path, true)?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }
}

impl Drop for FileDestination {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut destination = FileDestination::new(&path).unwrap();
        destination.write(b"{\"msg\":\"a\"}\n").unwrap();
        destination.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"msg\":\"a\"}\n");
    }

    #[test]
    fn test_mkdir_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("app.log");

        let options = FileOptions {
            mkdir: true,
            ..FileOptions::default()
        };
        let mut destination = FileDestination::with_options(&path, options).unwrap();
        destination.write(b"x\n").unwrap();
        destination.flush().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_missing_parent_without_mkdir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");

        let err = FileDestination::new(&path).err().expect("open should fail");
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }

    #[test]
    fn test_truncate_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let options = FileOptions {
            append: false,
            ..FileOptions::default()
        };
        let mut destination = FileDestination::with_options(&path, options).unwrap();
        destination.write(b"new\n").unwrap();
        destination.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_reopen_after_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let rotated = dir.path().join("app.log.1");

        let mut destination = FileDestination::new(&path).unwrap();
        destination.write(b"before\n").unwrap();
        destination.flush().unwrap();

        fs::rename(&path, &rotated).unwrap();
        destination.reopen().unwrap();
        destination.write(b"after\n").unwrap();
        destination.flush().unwrap();

        assert_eq!(fs::read_to_string(&rotated).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }
}
