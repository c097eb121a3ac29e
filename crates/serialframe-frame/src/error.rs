use serialframe_transport::TransportError;

use crate::decoder::DecoderState;

/// Errors that can occur during frame encoding/decoding.
///
/// Everything except [`FrameError::Transport`] describes a single bad frame;
/// the decoder is ready for the next frame as soon as one is returned.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended while scanning for a start byte.
    #[error("start byte not found ({skipped} bytes skipped before end of stream)")]
    StartNotFound { skipped: usize },

    /// The length byte is zero or above the configured maximum.
    #[error("invalid frame length {length} from address {address:#04x} (allowed 1..={max})")]
    InvalidLength { address: u8, length: u8, max: usize },

    /// The stream ended (or stalled) before the frame was complete.
    #[error("truncated frame in state {state} ({received} bytes received)")]
    Truncated { state: DecoderState, received: usize },

    /// The trailing checksum byte does not match the frame contents.
    #[error(
        "checksum mismatch from address {address:#04x} (expected {expected:#04x}, got {actual:#04x})"
    )]
    ChecksumMismatch {
        address: u8,
        message_type: u8,
        expected: u8,
        actual: u8,
    },

    /// An outbound packet does not fit in a single frame.
    #[error("frame too large ({size} message bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The transport failed underneath the codec.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Coarse classification of a [`FrameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameErrorKind {
    StartNotFound,
    InvalidLength,
    Truncated,
    ChecksumMismatch,
    FrameTooLarge,
    Transport,
}

impl FrameError {
    pub fn kind(&self) -> FrameErrorKind {
        match self {
            FrameError::StartNotFound { .. } => FrameErrorKind::StartNotFound,
            FrameError::InvalidLength { .. } => FrameErrorKind::InvalidLength,
            FrameError::Truncated { .. } => FrameErrorKind::Truncated,
            FrameError::ChecksumMismatch { .. } => FrameErrorKind::ChecksumMismatch,
            FrameError::FrameTooLarge { .. } => FrameErrorKind::FrameTooLarge,
            FrameError::Transport(_) => FrameErrorKind::Transport,
        }
    }

    /// True when the link itself is gone, not just one frame.
    ///
    /// Read timeouts are not fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Transport(err) if !err.is_timeout())
    }

    /// True for errors that describe an attempted frame that failed validation.
    pub fn is_frame_failure(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidLength { .. }
                | FrameError::Truncated { .. }
                | FrameError::ChecksumMismatch { .. }
        )
    }
}

impl FrameErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameErrorKind::StartNotFound => "start_not_found",
            FrameErrorKind::InvalidLength => "invalid_length",
            FrameErrorKind::Truncated => "truncated",
            FrameErrorKind::ChecksumMismatch => "checksum_mismatch",
            FrameErrorKind::FrameTooLarge => "frame_too_large",
            FrameErrorKind::Transport => "transport",
        }
    }
}

impl std::fmt::Display for FrameErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
