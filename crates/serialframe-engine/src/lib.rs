//! Threaded packet pump for serial links.
//!
//! The [`Engine`] owns one decode loop per transport. Decoded packets and
//! frame errors are handed to consumers over rendezvous channels, so memory
//! use stays flat no matter how far consumers lag; outbound packets flow the
//! other way through the frame encoder.
//!
//! For single-threaded polling, [`Engine::read`] decodes exactly one frame
//! per call without any channels.

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;

pub use config::{CancelToken, EngineConfig, DEFAULT_POLL_INTERVAL};
pub use engine::{Engine, EngineState, Termination};
pub use error::{EngineError, Result};
pub use handle::{EngineHandle, Event};
