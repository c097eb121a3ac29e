use std::path::PathBuf;

/// Errors that can occur in byte transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device or file at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The transport was used before `open()` or after `close()`.
    #[error("transport is not open")]
    NotOpen,

    /// An I/O error occurred on the underlying device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped accepting bytes.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// True for errors that only mean "no byte arrived in time".
    ///
    /// Read loops treat these as an idle link rather than a dead one.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::Io(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
