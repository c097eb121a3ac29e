use std::io::ErrorKind;

use crate::error::{Result, TransportError};

/// A blocking byte source and sink beneath the frame layer.
///
/// Implemented by real devices and by test doubles alike. Every call may
/// block. A `read` returning `Ok(0)` means end of stream.
pub trait Transport: Send {
    /// Open the underlying device. Opening an already-open transport is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Close the underlying device and release its handles.
    fn close(&mut self) -> Result<()>;

    /// Whether `open()` has succeeded and `close()` has not been called since.
    fn is_open(&self) -> bool;

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read a single byte, or `None` at end of stream.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(TransportError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Write some prefix of `buf`, returning how many bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Flush buffered output to the device.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Create a second handle to the same open device.
    ///
    /// The engine reads on one handle and writes on the clone.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}
