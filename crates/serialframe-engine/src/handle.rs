use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Select, Sender};
use serialframe_frame::{FrameError, Packet};

use crate::config::CancelToken;
use crate::engine::{EngineState, StateCell, Termination};
use crate::error::{EngineError, Result};

/// Something the engine handed over: a packet or a frame error.
#[derive(Debug)]
pub enum Event {
    Packet(Packet),
    Error(FrameError),
}

/// Handle to an engine running on its own thread.
///
/// All three channels are rendezvous channels: the engine does not decode
/// the next frame until the previous result has been received.
pub struct EngineHandle {
    packets: Receiver<Packet>,
    errors: Receiver<FrameError>,
    outbound: Sender<Packet>,
    cancel: CancelToken,
    state: StateCell,
    thread: JoinHandle<Result<Termination>>,
}

impl EngineHandle {
    pub(crate) fn new(
        packets: Receiver<Packet>,
        errors: Receiver<FrameError>,
        outbound: Sender<Packet>,
        cancel: CancelToken,
        state: StateCell,
        thread: JoinHandle<Result<Termination>>,
    ) -> Self {
        Self {
            packets,
            errors,
            outbound,
            cancel,
            state,
            thread,
        }
    }

    /// Stream of decoded packets.
    pub fn packets(&self) -> &Receiver<Packet> {
        &self.packets
    }

    /// Stream of non-fatal frame errors.
    pub fn errors(&self) -> &Receiver<FrameError> {
        &self.errors
    }

    /// A sender for outbound packets.
    pub fn sender(&self) -> Sender<Packet> {
        self.outbound.clone()
    }

    /// Queue one outbound packet, blocking until the writer takes it.
    pub fn send(&self, packet: Packet) -> Result<()> {
        self.outbound
            .send(packet)
            .map_err(|_| EngineError::Terminated)
    }

    /// Wait for the next packet or frame error.
    ///
    /// Returns `None` once the engine has stopped and both streams are drained.
    pub fn recv_event(&self) -> Option<Event> {
        self.select_event(None)
    }

    /// Like [`recv_event`](Self::recv_event), giving up after `timeout`.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<Event> {
        self.select_event(Some(Instant::now() + timeout))
    }

    /// Request shutdown; see [`CancelToken`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current lifecycle state of the engine.
    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Whether the engine thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the engine to stop on its own (end of stream or transport failure).
    ///
    /// An engine blocked handing over a packet only stops once it is received
    /// or the engine is cancelled.
    pub fn join(self) -> Result<Termination> {
        self.thread.join().map_err(|_| EngineError::Panicked)?
    }

    /// Cancel the engine and wait for it to stop.
    ///
    /// A blocking transport read is only interrupted by the transport itself
    /// (read timeout or close).
    pub fn shutdown(self) -> Result<Termination> {
        self.cancel.cancel();
        self.join()
    }

    fn select_event(&self, deadline: Option<Instant>) -> Option<Event> {
        let mut select = Select::new();
        let packets = select.recv(&self.packets);
        let errors = select.recv(&self.errors);
        let mut open = 2;

        loop {
            let op = match deadline {
                None => select.select(),
                Some(deadline) => select.select_deadline(deadline).ok()?,
            };

            if op.index() == packets {
                match op.recv(&self.packets) {
                    Ok(packet) => return Some(Event::Packet(packet)),
                    Err(_) => select.remove(packets),
                }
            } else {
                match op.recv(&self.errors) {
                    Ok(err) => return Some(Event::Error(err)),
                    Err(_) => select.remove(errors),
                }
            }

            open -= 1;
            if open == 0 {
                return None;
            }
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state.get())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
