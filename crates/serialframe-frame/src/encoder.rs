use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use serialframe_transport::{Transport, TransportError};

use crate::codec::{encode_packet, FrameConfig, HEADER_SIZE, MAX_MESSAGE_LEN, TRAILER_SIZE};
use crate::error::{FrameError, Result};
use crate::packet::Packet;

const INITIAL_BUFFER_CAPACITY: usize = HEADER_SIZE + MAX_MESSAGE_LEN + TRAILER_SIZE;

/// Pause between attempts while the device reports `WouldBlock`.
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);
/// `WouldBlock` attempts per write before the write counts as timed out.
const WOULD_BLOCK_RETRIES: u32 = 100;

/// Writes complete frames to a [`Transport`].
pub struct FrameEncoder {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameEncoder {
    /// Create a new frame encoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame encoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode a packet into the internal buffer and return the wire bytes.
    pub fn encode(&mut self, packet: &Packet) -> Result<&[u8]> {
        self.buf.clear();
        encode_packet(packet, &self.config, &mut self.buf)?;
        Ok(&self.buf[..])
    }

    /// Write a complete frame (blocking).
    pub fn write_packet<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        packet: &Packet,
    ) -> Result<()> {
        self.buf.clear();
        encode_packet(packet, &self.config, &mut self.buf)?;

        let mut offset = 0usize;
        let mut blocked = 0u32;
        while offset < self.buf.len() {
            match transport.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::Transport(TransportError::Closed)),
                Ok(n) => offset += n,
                Err(err) => back_off(err, &mut blocked)?,
            }
        }

        loop {
            match transport.flush() {
                Ok(()) => return Ok(()),
                Err(err) => back_off(err, &mut blocked)?,
            }
        }
    }

    /// Current frame encoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide whether a failed write or flush may be retried.
///
/// `Interrupted` retries at once. `WouldBlock` sleeps briefly and gives up
/// after [`WOULD_BLOCK_RETRIES`] attempts, returning the error, which callers
/// see as a timeout rather than a dead link.
fn back_off(err: TransportError, blocked: &mut u32) -> Result<()> {
    let kind = match &err {
        TransportError::Io(io) => Some(io.kind()),
        _ => None,
    };
    match kind {
        Some(std::io::ErrorKind::Interrupted) => Ok(()),
        Some(std::io::ErrorKind::WouldBlock) if *blocked < WOULD_BLOCK_RETRIES => {
            *blocked += 1;
            thread::sleep(WOULD_BLOCK_BACKOFF);
            Ok(())
        }
        _ => Err(FrameError::Transport(err)),
    }
}
