//! Destination implementations

pub mod console;
pub mod memory;
pub mod writer;

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "network")]
pub mod network;

pub use console::{ConsoleDestination, ConsoleTarget};
pub use memory::{MemoryDestination, MemoryHandle};
pub use writer::WriterDestination;

#[cfg(feature = "file")]
pub use file::{FileDestination, FileOptions};
#[cfg(feature = "network")]
pub use network::TcpDestination;

pub use crate::core::Destination;
