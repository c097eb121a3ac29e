use std::sync::Arc;

use bytes::{BufMut, BytesMut};

use crate::checksum::{Checksum, TwosComplementSum};
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Frame header: start (1) + address (1) + length (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Frame trailer: checksum (1).
pub const TRAILER_SIZE: usize = 1;

/// Start byte that opens every frame.
pub const START_BYTE: u8 = 0xFF;

/// Largest message the one-byte length field can describe.
pub const MAX_MESSAGE_LEN: usize = u8::MAX as usize;

/// Default maximum message size (type byte + payload).
pub const DEFAULT_MAX_MESSAGE_LEN: usize = MAX_MESSAGE_LEN;

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬─────────┬────────┬──────────┬─────────────┬──────────┐
/// │ Start │ Address │ Length │ Type     │ Payload     │ Checksum │
/// │ 0xFF  │ (1B)    │ (1B)   │ (1B)     │ (Length-1B) │ (1B)     │
/// └───────┴─────────┴────────┴──────────┴─────────────┴──────────┘
/// ```
pub fn encode_packet(packet: &Packet, config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    let message_len = packet.message_len();
    let max = config.max_message_len();
    if message_len > max {
        return Err(FrameError::FrameTooLarge {
            size: message_len,
            max,
        });
    }
    let length = message_len as u8;

    let start = dst.len();
    dst.reserve(packet.wire_size());
    dst.put_u8(START_BYTE);
    dst.put_u8(packet.address());
    dst.put_u8(length);
    dst.put_u8(packet.message_type());
    dst.put_slice(packet.payload());

    let message = &dst[start + HEADER_SIZE..];
    let checksum = config.checksum.compute(packet.address(), length, message);
    dst.put_u8(checksum);
    Ok(())
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size (type + payload) in bytes. Default: 255.
    ///
    /// Values above 255 are treated as 255; the length field is one byte.
    pub max_message_len: usize,
    /// Checksum shared by the decoder and the encoder.
    pub checksum: Arc<dyn Checksum>,
}

impl FrameConfig {
    /// Replace the checksum function.
    pub fn with_checksum(mut self, checksum: impl Checksum + 'static) -> Self {
        self.checksum = Arc::new(checksum);
        self
    }

    /// Replace the maximum message size.
    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// The effective maximum, clamped to what the length byte can carry.
    pub fn max_message_len(&self) -> usize {
        self.max_message_len.min(MAX_MESSAGE_LEN)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            checksum: Arc::new(TwosComplementSum),
        }
    }
}
