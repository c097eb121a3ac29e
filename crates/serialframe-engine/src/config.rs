use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serialframe_frame::FrameConfig;

/// Default interval at which blocked sends re-check for cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frame codec settings shared by the decoder and the encoder.
    pub frame: FrameConfig,
    /// How often a blocked channel operation re-checks for cancellation.
    pub poll_interval: Duration,
    /// Retry reading after end of stream instead of terminating.
    ///
    /// For devices that report end of stream whenever they are momentarily
    /// idle. `None` (the default) treats end of stream as final.
    pub eof_retry: Option<Duration>,
    /// Name of the decode thread; the writer thread appends `-writer`.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            eof_retry: None,
            thread_name: "serialframe-engine".to_string(),
        }
    }
}

/// Cooperative shutdown signal for a running engine.
///
/// Checked between frames and while a send is waiting on a consumer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
