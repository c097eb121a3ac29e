use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// An in-memory serial link.
///
/// Bytes handed to [`feed`](Self::feed) become readable; bytes written by the
/// transport user are collected for [`take_written`](Self::take_written).
/// Reads block while no input is pending, like a real port, until more input
/// is fed, the input side is closed (end of stream) or the read timeout
/// elapses. Clones share the same device.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
    read_timeout: Option<Duration>,
    open: bool,
}

struct Shared {
    state: Mutex<State>,
    readable: Condvar,
}

#[derive(Default)]
struct State {
    input: VecDeque<u8>,
    output: Vec<u8>,
    input_closed: bool,
    output_closed: bool,
}

impl MemoryTransport {
    /// Create an open transport with no pending input.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                readable: Condvar::new(),
            }),
            read_timeout: None,
            open: true,
        }
    }

    /// Create an open transport whose input is exactly `bytes` followed by end of stream.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let transport = Self::new();
        transport.feed(bytes);
        transport.close_input();
        transport
    }

    /// Fail reads with `TimedOut` after waiting this long for input.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Make `bytes` available to readers.
    pub fn feed(&self, bytes: &[u8]) {
        let mut state = self.lock();
        state.input.extend(bytes.iter().copied());
        trace!(len = bytes.len(), "fed memory transport");
        self.shared.readable.notify_all();
    }

    /// Signal end of stream once pending input has been read.
    pub fn close_input(&self) {
        self.lock().input_closed = true;
        self.shared.readable.notify_all();
    }

    /// Make every subsequent write fail with [`TransportError::Closed`].
    pub fn close_output(&self) {
        self.lock().output_closed = true;
    }

    /// Number of fed bytes not yet read.
    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }

    /// Drain and return everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().output)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    /// Closing any handle ends the input stream for every handle.
    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.close_input();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = self.read_timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.lock();
        loop {
            if !state.input.is_empty() {
                let n = buf.len().min(state.input.len());
                for (slot, byte) in buf.iter_mut().zip(state.input.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if state.input_closed {
                return Ok(0);
            }

            state = match deadline {
                None => self
                    .shared
                    .readable
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::Io(std::io::Error::from(
                            std::io::ErrorKind::TimedOut,
                        )));
                    }
                    self.shared
                        .readable
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
            };
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let mut state = self.lock();
        if state.output_closed {
            return Err(TransportError::Closed);
        }
        state.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("open", &self.open)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
