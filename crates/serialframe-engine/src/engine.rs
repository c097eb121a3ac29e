use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use serialframe_frame::{DecoderStats, FrameDecoder, FrameEncoder, FrameError, Packet};
use serialframe_transport::Transport;
use tracing::{debug, info, trace, warn};

use crate::config::{CancelToken, EngineConfig};
use crate::error::{EngineError, Result};
use crate::handle::EngineHandle;

/// Engine lifecycle: `Idle → Running → Terminated`. Termination is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Terminated,
}

/// Why a running engine stopped without a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The [`CancelToken`] was triggered.
    Cancelled,
    /// The transport reported end of stream and no retry was configured.
    EndOfStream,
    /// The packet consumer went away.
    ConsumerClosed,
}

/// Lifecycle state shared between an engine and its handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn get(&self) -> EngineState {
        match self.0.load(Ordering::SeqCst) {
            0 => EngineState::Idle,
            1 => EngineState::Running,
            _ => EngineState::Terminated,
        }
    }

    fn set(&self, state: EngineState) {
        let value = match state {
            EngineState::Idle => 0,
            EngineState::Running => 1,
            EngineState::Terminated => 2,
        };
        self.0.store(value, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Control {
    halt: AtomicBool,
    writer_failed: AtomicBool,
}

#[derive(Debug)]
enum Exit {
    Done(Termination),
    Fatal(FrameError),
    WriterFailed,
}

/// Bridges a blocking [`Transport`] to packet channels.
///
/// Inbound bytes are decoded one frame at a time; every packet and every
/// frame error is handed over a rendezvous channel, so a slow consumer stalls
/// decoding instead of growing a queue. Outbound packets are encoded and
/// written on a second thread using a clone of the transport.
pub struct Engine<T> {
    transport: T,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    config: EngineConfig,
    state: StateCell,
    cancel: CancelToken,
}

impl<T: Transport> Engine<T> {
    /// Create an engine with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::with_config(config.frame.clone()),
            encoder: FrameEncoder::with_config(config.frame.clone()),
            config,
            state: StateCell::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Decode exactly one frame (blocking), without channels.
    ///
    /// Frame errors are returned as [`EngineError::Frame`] and leave the
    /// engine usable. A fatal transport error terminates it.
    pub fn read(&mut self) -> Result<Packet> {
        self.prepare()?;
        match self.decoder.decode_next(&mut self.transport) {
            Ok(packet) => Ok(packet),
            Err(err) => Err(self.fail_sync(err)),
        }
    }

    /// Encode and write one packet (blocking), without channels.
    pub fn write(&mut self, packet: &Packet) -> Result<()> {
        self.prepare()?;
        self.encoder
            .write_packet(&mut self.transport, packet)
            .map_err(|err| self.fail_sync(err))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Token that stops a running engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Decoder totals so far.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Current engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    fn prepare(&mut self) -> Result<()> {
        if self.state.get() == EngineState::Terminated {
            return Err(EngineError::Terminated);
        }
        if !self.transport.is_open() {
            self.transport.open()?;
        }
        Ok(())
    }

    fn fail_sync(&mut self, err: FrameError) -> EngineError {
        if err.is_fatal() {
            warn!(error = %err, "transport failed; engine terminated");
            self.terminate();
        }
        err.into()
    }

    fn terminate(&mut self) {
        self.state.set(EngineState::Terminated);
        if let Err(err) = self.transport.close() {
            debug!(error = %err, "transport close failed");
        }
    }
}

impl<T: Transport + 'static> Engine<T> {
    /// Run the engine on the calling thread until it terminates.
    ///
    /// Decoded packets go to `out`, non-fatal frame errors to `out_err`, and
    /// packets received on `input` are written to the transport. Use
    /// zero-capacity channels to keep decoding in lockstep with consumers.
    ///
    /// Returns the reason for stopping, or the fatal transport error.
    pub fn start(
        &mut self,
        out: Sender<Packet>,
        out_err: Sender<FrameError>,
        input: Receiver<Packet>,
    ) -> Result<Termination> {
        match self.state.get() {
            EngineState::Idle => {}
            EngineState::Running => return Err(EngineError::AlreadyRunning),
            EngineState::Terminated => return Err(EngineError::Terminated),
        }
        self.prepare()?;
        let writer_transport = self.transport.try_clone()?;
        self.state.set(EngineState::Running);

        let control = Arc::new(Control::default());
        let writer = {
            let control = Arc::clone(&control);
            let encoder = FrameEncoder::with_config(self.config.frame.clone());
            let errors = out_err.clone();
            let poll = self.config.poll_interval;
            thread::Builder::new()
                .name(format!("{}-writer", self.config.thread_name))
                .spawn(move || write_loop(writer_transport, encoder, input, errors, &control, poll))
        };
        let writer = match writer {
            Ok(handle) => handle,
            Err(err) => {
                self.terminate();
                return Err(EngineError::Spawn(err));
            }
        };
        info!(thread = %self.config.thread_name, "engine started");

        let exit = self.decode_loop(&out, &out_err, &control);

        control.halt.store(true, Ordering::SeqCst);
        let writer_result = writer.join();
        self.terminate();

        let outcome = match (exit, writer_result) {
            (_, Err(_)) => Err(EngineError::Panicked),
            (_, Ok(Err(err))) => Err(err.into()),
            (Exit::Fatal(err), Ok(Ok(()))) => Err(err.into()),
            (Exit::Done(termination), Ok(Ok(()))) => Ok(termination),
            (Exit::WriterFailed, Ok(Ok(()))) => Err(EngineError::Terminated),
        };
        match &outcome {
            Ok(termination) => info!(?termination, stats = ?self.decoder.stats(), "engine stopped"),
            Err(err) => warn!(error = %err, stats = ?self.decoder.stats(), "engine stopped"),
        }
        outcome
    }

    /// Run the engine on a dedicated thread with rendezvous channels.
    pub fn spawn(self) -> Result<EngineHandle> {
        let (packet_tx, packet_rx) = bounded(0);
        let (error_tx, error_rx) = bounded(0);
        let (outbound_tx, outbound_rx) = bounded(0);

        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let name = self.config.thread_name.clone();

        let mut engine = self;
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || engine.start(packet_tx, error_tx, outbound_rx))
            .map_err(EngineError::Spawn)?;

        Ok(EngineHandle::new(
            packet_rx,
            error_rx,
            outbound_tx,
            cancel,
            state,
            thread,
        ))
    }

    fn decode_loop(
        &mut self,
        out: &Sender<Packet>,
        out_err: &Sender<FrameError>,
        control: &Control,
    ) -> Exit {
        let mut errors_open = true;
        loop {
            if self.cancel.is_cancelled() {
                return Exit::Done(Termination::Cancelled);
            }
            if control.writer_failed.load(Ordering::SeqCst) {
                return Exit::WriterFailed;
            }

            match self.decoder.decode_next(&mut self.transport) {
                Ok(packet) => {
                    trace!(
                        address = packet.address(),
                        message_type = packet.message_type(),
                        len = packet.payload().len(),
                        "packet decoded"
                    );
                    if let Some(exit) = self.deliver(out, packet, control) {
                        return exit;
                    }
                }
                Err(FrameError::StartNotFound { .. }) => match self.config.eof_retry {
                    Some(interval) => thread::sleep(interval),
                    None => {
                        debug!("end of stream");
                        return Exit::Done(Termination::EndOfStream);
                    }
                },
                Err(err) if err.is_fatal() => return Exit::Fatal(err),
                // Read timeout while idle.
                Err(FrameError::Transport(_)) => continue,
                Err(err) => {
                    debug!(error = %err, kind = %err.kind(), "frame error");
                    if !errors_open {
                        continue;
                    }
                    match self.deliver(out_err, err, control) {
                        None => {}
                        Some(Exit::Done(Termination::ConsumerClosed)) => {
                            warn!("frame error consumer closed; further frame errors are only logged");
                            errors_open = false;
                        }
                        Some(exit) => return exit,
                    }
                }
            }
        }
    }

    /// Hand `msg` to a consumer, waiting as long as it takes.
    fn deliver<M>(&self, sender: &Sender<M>, msg: M, control: &Control) -> Option<Exit> {
        let mut msg = msg;
        loop {
            match sender.send_timeout(msg, self.config.poll_interval) {
                Ok(()) => return None,
                Err(SendTimeoutError::Timeout(pending)) => {
                    if self.cancel.is_cancelled() {
                        return Some(Exit::Done(Termination::Cancelled));
                    }
                    if control.writer_failed.load(Ordering::SeqCst) {
                        return Some(Exit::WriterFailed);
                    }
                    msg = pending;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Some(Exit::Done(Termination::ConsumerClosed))
                }
            }
        }
    }
}

fn write_loop<T: Transport>(
    mut transport: T,
    mut encoder: FrameEncoder,
    input: Receiver<Packet>,
    errors: Sender<FrameError>,
    control: &Control,
    poll: Duration,
) -> std::result::Result<(), FrameError> {
    loop {
        if control.halt.load(Ordering::SeqCst) {
            return Ok(());
        }
        let packet = match input.recv_timeout(poll) {
            Ok(packet) => packet,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("outbound channel closed; writer exiting");
                return Ok(());
            }
        };

        match encoder.write_packet(&mut transport, &packet) {
            Ok(()) => trace!(
                address = packet.address(),
                message_type = packet.message_type(),
                "packet written"
            ),
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "write failed; stopping engine");
                control.writer_failed.store(true, Ordering::SeqCst);
                if let Err(close_err) = transport.close() {
                    debug!(error = %close_err, "transport close failed");
                }
                return Err(err);
            }
            Err(err) => {
                debug!(error = %err, "outbound packet rejected");
                let mut pending = err;
                loop {
                    match errors.send_timeout(pending, poll) {
                        Ok(()) => break,
                        Err(SendTimeoutError::Timeout(err)) => {
                            if control.halt.load(Ordering::SeqCst) {
                                return Ok(());
                            }
                            pending = err;
                        }
                        Err(SendTimeoutError::Disconnected(_)) => break,
                    }
                }
            }
        }
    }
}
