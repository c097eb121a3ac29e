//! Start-byte framed packet codec for point-to-point serial links.
//!
//! Every frame on the wire looks like:
//! - a fixed start byte (`0xFF`)
//! - a one-byte device address
//! - a one-byte length covering the message type and payload
//! - the message (type byte, then payload)
//! - a one-byte checksum
//!
//! [`FrameDecoder`] turns a byte stream into validated [`Packet`]s and
//! re-synchronizes on its own after corrupted input. [`FrameEncoder`] is
//! the inverse.

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod packet;

pub use checksum::{Checksum, ChecksumFn, TwosComplementSum, XorChecksum};
pub use codec::{
    encode_packet, FrameConfig, DEFAULT_MAX_MESSAGE_LEN, HEADER_SIZE, MAX_MESSAGE_LEN, START_BYTE,
    TRAILER_SIZE,
};
pub use decoder::{DecoderState, DecoderStats, FrameDecoder};
pub use encoder::FrameEncoder;
pub use error::{FrameError, FrameErrorKind, Result};
pub use packet::Packet;
