//! Blocking byte transport abstraction for point-to-point serial links.
//!
//! This is the lowest layer of serialframe. The frame decoder and the engine
//! only ever talk to a [`Transport`]:
//! - [`FileTransport`] wraps a device node or capture file
//! - [`MemoryTransport`] is an in-memory link used for loopback and tests
//!
//! Port setup (baud rate, parity, termios) is left to the caller.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use file::FileTransport;
pub use memory::MemoryTransport;
pub use traits::Transport;
