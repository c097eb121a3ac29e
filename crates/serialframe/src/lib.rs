//! Resynchronizing packet framing for byte-oriented serial links.
//!
//! Frames are `0xFF | address | length | message | checksum`, where the first
//! message byte is the message type. A corrupt or truncated frame produces one
//! error and the decoder resynchronizes on the next start byte.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking byte transports (files, device nodes, in-memory links)
//! - [`frame`]: packet type, checksums, frame decoder and encoder
//! - [`engine`]: threaded pump between a transport and rendezvous channels
//!   (behind the `engine` feature, on by default)

/// Re-export transport types.
pub mod transport {
    pub use serialframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialframe_frame::*;
}

/// Re-export engine types (requires `engine` feature).
#[cfg(feature = "engine")]
pub mod engine {
    pub use serialframe_engine::*;
}
