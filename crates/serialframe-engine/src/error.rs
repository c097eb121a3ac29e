use serialframe_frame::FrameError;
use serialframe_transport::TransportError;

/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Transport-level error. Terminates the engine.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error from a synchronous `read`/`write`.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// `start` was called on an engine that is already running.
    #[error("engine already running")]
    AlreadyRunning,

    /// The engine has terminated; termination is final.
    #[error("engine terminated")]
    Terminated,

    /// The engine or writer thread could not be spawned.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),

    /// An engine thread panicked.
    #[error("engine thread panicked")]
    Panicked,
}

impl From<FrameError> for EngineError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Transport(err) => EngineError::Transport(err),
            other => EngineError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
