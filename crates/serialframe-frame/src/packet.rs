use bytes::Bytes;

use crate::codec::{HEADER_SIZE, TRAILER_SIZE};

/// A decoded, checksum-validated protocol message.
///
/// The address is forwarded as-is from the wire and reused verbatim when the
/// packet is encoded. Packets are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    address: u8,
    message_type: u8,
    payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(address: u8, message_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            message_type,
            payload: payload.into(),
        }
    }

    /// Device address byte.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// First message byte.
    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    /// Message bytes after the type byte.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the packet and return its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Value of the wire length byte: message type plus payload.
    pub fn message_len(&self) -> usize {
        self.payload.len() + 1
    }

    /// The total wire size of this packet once framed.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.message_len() + TRAILER_SIZE
    }
}
