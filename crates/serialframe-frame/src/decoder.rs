use std::collections::VecDeque;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serialframe_transport::Transport;
use tracing::{debug, trace};

use crate::codec::{FrameConfig, HEADER_SIZE, MAX_MESSAGE_LEN, START_BYTE, TRAILER_SIZE};
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Where the decoder is inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    SeekStart,
    ReadAddress,
    ReadLength,
    ReadMessage { remaining: usize },
    ReadChecksum,
}

impl fmt::Display for DecoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderState::SeekStart => f.write_str("seek_start"),
            DecoderState::ReadAddress => f.write_str("read_address"),
            DecoderState::ReadLength => f.write_str("read_length"),
            DecoderState::ReadMessage { remaining } => {
                write!(f, "read_message({remaining} remaining)")
            }
            DecoderState::ReadChecksum => f.write_str("read_checksum"),
        }
    }
}

/// Running totals kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed validation.
    pub packets: u64,
    /// Attempted frames that failed validation.
    pub failed_frames: u64,
    /// Bytes discarded while scanning for a start byte, counting the start
    /// byte of each dropped resync candidate.
    pub skipped_bytes: u64,
}

/// Byte-at-a-time frame parser.
///
/// Each [`decode_next`](Self::decode_next) call yields exactly one packet or
/// one error. A frame that fails validation yields exactly one error, and the
/// decoder is back in [`DecoderState::SeekStart`] afterwards.
///
/// Bytes of a failed frame that followed its start byte are scanned again by
/// the next call before any new transport byte is read, so a real start byte
/// swallowed by a corrupt length is not lost. A frame found during that
/// rescan is only a candidate: if it fails it is dropped without an error,
/// and it gives up rather than block on the transport once it has swallowed
/// another start byte. Transport bytes are read once, and memory use is
/// bounded by one maximum-size frame.
pub struct FrameDecoder {
    config: FrameConfig,
    state: DecoderState,
    frame: BytesMut,
    replay: VecDeque<u8>,
    /// Leading `replay` bytes that belong to failed frames.
    rescan: usize,
    /// Bytes of `frame` taken from the rescan region.
    frame_rescan: usize,
    /// The current frame started inside the rescan region.
    candidate: bool,
    stats: DecoderStats,
}

/// How a frame attempt ended without a packet.
enum Rejected {
    Reported(FrameError),
    Dropped,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Source {
    Rescan,
    Buffered,
    Transport,
}

impl FrameDecoder {
    /// Create a new decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        let capacity = HEADER_SIZE + MAX_MESSAGE_LEN + TRAILER_SIZE;
        Self {
            config,
            state: DecoderState::SeekStart,
            frame: BytesMut::with_capacity(capacity),
            replay: VecDeque::with_capacity(capacity),
            rescan: 0,
            frame_rescan: 0,
            candidate: false,
            stats: DecoderStats::default(),
        }
    }

    /// Decode the next frame from `transport` (blocking).
    ///
    /// Returns `Err(FrameError::StartNotFound)` when the stream ends before
    /// another frame starts.
    pub fn decode_next<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Packet> {
        loop {
            self.seek_start(transport)?;
            match self.read_frame(transport) {
                Ok(packet) => return Ok(packet),
                Err(Rejected::Reported(err)) => return Err(err),
                Err(Rejected::Dropped) => continue,
            }
        }
    }

    /// Current position in the frame state machine.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Running totals since creation or the last [`reset`](Self::reset).
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Already-read bytes waiting to be scanned again.
    pub fn buffered(&self) -> usize {
        self.replay.len()
    }

    /// Drop all buffered bytes, partial state and counters.
    pub fn reset(&mut self) {
        self.state = DecoderState::SeekStart;
        self.frame.clear();
        self.replay.clear();
        self.rescan = 0;
        self.frame_rescan = 0;
        self.candidate = false;
        self.stats = DecoderStats::default();
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn seek_start<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        self.state = DecoderState::SeekStart;
        self.frame.clear();
        self.frame_rescan = 0;

        let mut skipped = 0usize;
        loop {
            match self.next_byte(transport) {
                Ok(Some((START_BYTE, source))) => {
                    self.note_skipped(skipped);
                    self.candidate = source == Source::Rescan;
                    return Ok(());
                }
                Ok(Some(_)) => skipped += 1,
                Ok(None) => {
                    self.note_skipped(skipped);
                    return Err(FrameError::StartNotFound { skipped });
                }
                Err(err) => {
                    self.note_skipped(skipped);
                    return Err(err);
                }
            }
        }
    }

    fn read_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> std::result::Result<Packet, Rejected> {
        self.state = DecoderState::ReadAddress;
        let address = self.frame_byte(transport)?;

        self.state = DecoderState::ReadLength;
        let length = self.frame_byte(transport)?;
        let max = self.config.max_message_len();
        if length == 0 || usize::from(length) > max {
            return Err(self.reject(FrameError::InvalidLength {
                address,
                length,
                max,
            }));
        }

        for remaining in (1..=usize::from(length)).rev() {
            self.state = DecoderState::ReadMessage { remaining };
            self.frame_byte(transport)?;
        }

        self.state = DecoderState::ReadChecksum;
        let actual = self.frame_byte(transport)?;

        let message = &self.frame[2..2 + usize::from(length)];
        let message_type = message[0];
        let expected = self.config.checksum.compute(address, length, message);
        if expected != actual {
            return Err(self.reject(FrameError::ChecksumMismatch {
                address,
                message_type,
                expected,
                actual,
            }));
        }

        let packet = Packet::new(address, message_type, Bytes::copy_from_slice(&message[1..]));
        self.frame.clear();
        self.frame_rescan = 0;
        self.state = DecoderState::SeekStart;
        self.stats.packets += 1;
        Ok(packet)
    }

    fn next_byte<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<(u8, Source)>> {
        if let Some(byte) = self.replay.pop_front() {
            if self.rescan > 0 {
                self.rescan -= 1;
                return Ok(Some((byte, Source::Rescan)));
            }
            return Ok(Some((byte, Source::Buffered)));
        }
        let byte = transport.read_byte().map_err(FrameError::Transport)?;
        Ok(byte.map(|byte| (byte, Source::Transport)))
    }

    /// Read one byte belonging to the frame after the start byte.
    fn frame_byte<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> std::result::Result<u8, Rejected> {
        // A candidate holding another start byte must not wait on the link:
        // that start byte may begin a frame that has already fully arrived.
        if self.candidate && self.replay.is_empty() && self.frame.contains(&START_BYTE) {
            return Err(self.reject(self.truncated_error()));
        }

        match self.next_byte(transport) {
            Ok(Some((byte, source))) => {
                if source == Source::Rescan {
                    self.frame_rescan += 1;
                }
                self.frame.put_u8(byte);
                Ok(byte)
            }
            Ok(None) => Err(self.reject(self.truncated_error())),
            Err(FrameError::Transport(err)) if err.is_timeout() => {
                Err(self.reject(self.truncated_error()))
            }
            Err(err) => {
                self.frame.clear();
                self.frame_rescan = 0;
                self.state = DecoderState::SeekStart;
                Err(Rejected::Reported(err))
            }
        }
    }

    fn truncated_error(&self) -> FrameError {
        FrameError::Truncated {
            state: self.state,
            received: 1 + self.frame.len(),
        }
    }

    /// Abandon the current frame and queue its bytes for rescanning.
    ///
    /// Only frames whose start byte was not itself being rescanned count as
    /// failed; a failed candidate is dropped like noise.
    fn reject(&mut self, err: FrameError) -> Rejected {
        let rescan = if self.candidate {
            self.frame_rescan
        } else {
            self.frame.len()
        };
        for byte in self.frame.iter().rev() {
            self.replay.push_front(*byte);
        }
        self.rescan += rescan;
        self.frame.clear();
        self.frame_rescan = 0;
        self.state = DecoderState::SeekStart;

        if self.candidate {
            self.stats.skipped_bytes += 1;
            trace!(reason = %err, rescan = self.rescan, "resync candidate dropped");
            return Rejected::Dropped;
        }
        self.stats.failed_frames += 1;
        debug!(error = %err, rescan = self.rescan, "frame rejected");
        Rejected::Reported(err)
    }

    fn note_skipped(&mut self, skipped: usize) {
        if skipped > 0 {
            self.stats.skipped_bytes += skipped as u64;
            trace!(skipped, "skipped bytes before start byte");
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("state", &self.state)
            .field("buffered", &self.replay.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::BytesMut;
    use serialframe_transport::{MemoryTransport, TransportError};

    use super::*;
    use crate::checksum::XorChecksum;
    use crate::codec::encode_packet;
    use crate::error::FrameErrorKind;

    const GOOD: [u8; 8] = [0xFF, 2, 4, 0x1b, 0x01, 0x01, 0x01, 0xDD];

    fn expected_packet() -> Packet {
        Packet::new(2, 0x1b, vec![0x01, 0x01, 0x01])
    }

    fn wire(packets: &[Packet]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for packet in packets {
            encode_packet(packet, &FrameConfig::default(), &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn three_captured_frames_decode_cleanly() {
        let bytes: Vec<u8> = GOOD.iter().chain(&GOOD).chain(&GOOD).copied().collect();
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        for _ in 0..3 {
            let packet = decoder.decode_next(&mut transport).unwrap();
            assert_eq!(packet, expected_packet());
            assert_eq!(decoder.state(), DecoderState::SeekStart);
        }
        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { skipped: 0 })
        ));
        assert_eq!(decoder.stats().packets, 3);
        assert_eq!(decoder.stats().failed_frames, 0);
    }

    #[test]
    fn short_frame_then_good_frame() {
        let mut bytes = vec![0xFF, 2, 4, 0x1b, 0x01, 0xDD];
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert_eq!(err.kind(), FrameErrorKind::ChecksumMismatch);

        let packet = decoder.decode_next(&mut transport).unwrap();
        assert_eq!(packet, expected_packet());

        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { .. })
        ));
        assert_eq!(decoder.stats().failed_frames, 1);
        assert_eq!(decoder.stats().packets, 1);
    }

    #[test]
    fn garbled_lead_in_then_good_frame() {
        let mut bytes = vec![0xFF, 2];
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(err.is_frame_failure());

        let packet = decoder.decode_next(&mut transport).unwrap();
        assert_eq!(packet, expected_packet());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn garbled_lead_in_rejected_by_length_limit() {
        let mut bytes = vec![0xFF, 2];
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder =
            FrameDecoder::with_config(FrameConfig::default().with_max_message_len(32));

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidLength {
                address: 2,
                length: 0xFF,
                max: 32
            }
        ));

        let packet = decoder.decode_next(&mut transport).unwrap();
        assert_eq!(packet, expected_packet());
    }

    #[test]
    fn zero_length_is_invalid() {
        let mut bytes = vec![0xFF, 9, 0];
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { length: 0, .. }));
        assert_eq!(decoder.decode_next(&mut transport).unwrap(), expected_packet());
    }

    #[test]
    fn noise_before_start_is_absorbed_silently() {
        let mut bytes = vec![0x00, 0x13, 0x37, 0xFE];
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.decode_next(&mut transport).unwrap(), expected_packet());
        assert_eq!(decoder.stats().skipped_bytes, 4);
        assert_eq!(decoder.stats().failed_frames, 0);
    }

    #[test]
    fn noise_only_stream_reports_start_not_found_once() {
        let mut transport = MemoryTransport::from_bytes(&[1, 2, 3]);
        let mut decoder = FrameDecoder::new();

        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { skipped: 3 })
        ));
        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { skipped: 0 })
        ));
        assert_eq!(decoder.stats().failed_frames, 0);
    }

    #[test]
    fn truncated_at_end_of_stream() {
        let mut transport = MemoryTransport::from_bytes(&[0xFF, 2, 4, 0x1b, 0x01]);
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                state: DecoderState::ReadMessage { remaining: 2 },
                received: 5
            }
        ));
        // The rescanned tail holds no start byte.
        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { skipped: 4 })
        ));
    }

    #[test]
    fn stalled_frame_is_truncated_and_recovered() {
        let mut transport = MemoryTransport::new().with_read_timeout(Duration::from_millis(10));
        transport.feed(&[0xFF, 2, 4, 0x1b]);
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert_eq!(err.kind(), FrameErrorKind::Truncated);
        assert!(!err.is_fatal());

        transport.feed(&GOOD);
        assert_eq!(decoder.decode_next(&mut transport).unwrap(), expected_packet());
    }

    #[test]
    fn idle_timeout_while_seeking_is_not_a_frame_failure() {
        let mut transport = MemoryTransport::new().with_read_timeout(Duration::from_millis(10));
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(matches!(&err, FrameError::Transport(e) if e.is_timeout()));
        assert!(!err.is_fatal());
        assert_eq!(decoder.stats().failed_frames, 0);
    }

    #[test]
    fn fatal_transport_error_drops_partial_frame() {
        let mut transport = FailingAfter {
            bytes: vec![0xFF, 2, 4],
            pos: 0,
        };
        let mut decoder = FrameDecoder::new();

        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.state(), DecoderState::SeekStart);
    }

    #[test]
    fn corrupt_frame_between_good_frames_has_no_bleed() {
        let mut bytes = GOOD.to_vec();
        let mut corrupt = GOOD.to_vec();
        corrupt[5] ^= 0x40;
        bytes.extend_from_slice(&corrupt);
        bytes.extend_from_slice(&GOOD);
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.decode_next(&mut transport).unwrap(), expected_packet());
        let err = decoder.decode_next(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                address: 2,
                message_type: 0x1b,
                actual: 0xDD,
                ..
            }
        ));
        assert_eq!(decoder.decode_next(&mut transport).unwrap(), expected_packet());
        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { skipped: 0 })
        ));
    }

    #[test]
    fn every_attempted_frame_yields_exactly_one_result() {
        let good = Packet::new(0x10, 0x42, vec![0xAB; 6]);
        let good_wire = wire(std::slice::from_ref(&good));
        let mut bad_checksum = good_wire.clone();
        *bad_checksum.last_mut().unwrap() ^= 0x01;

        let mut bytes = Vec::new();
        for i in 0..20 {
            if i % 4 == 1 {
                bytes.extend_from_slice(&bad_checksum);
            } else {
                bytes.extend_from_slice(&good_wire);
            }
        }
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        let mut packets = 0;
        let mut errors = 0;
        loop {
            match decoder.decode_next(&mut transport) {
                Ok(packet) => {
                    assert_eq!(packet, good);
                    packets += 1;
                }
                Err(FrameError::StartNotFound { .. }) => break,
                Err(err) => {
                    assert_eq!(err.kind(), FrameErrorKind::ChecksumMismatch);
                    errors += 1;
                }
            }
        }

        assert_eq!(packets, 15);
        assert_eq!(errors, 5);
        assert_eq!(decoder.stats().failed_frames, 5);
    }

    fn drain(decoder: &mut FrameDecoder, transport: &mut MemoryTransport) -> Vec<String> {
        let mut seen = Vec::new();
        loop {
            match decoder.decode_next(transport) {
                Ok(packet) => {
                    assert_eq!(packet, expected_packet());
                    seen.push("packet".to_string());
                }
                Err(FrameError::StartNotFound { .. }) => return seen,
                Err(err) => seen.push(err.kind().to_string()),
            }
        }
    }

    #[test]
    fn start_bytes_inside_corrupt_frame_report_one_error() {
        let mut bytes = wire(&[Packet::new(2, 0x1b, vec![0xFF, 0xFF, 0xFF])]);
        *bytes.last_mut().unwrap() ^= 0x01;
        for _ in 0..3 {
            bytes.extend_from_slice(&GOOD);
        }
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        assert_eq!(
            drain(&mut decoder, &mut transport),
            vec!["checksum_mismatch", "packet", "packet", "packet"]
        );
        assert_eq!(decoder.stats().failed_frames, 1);
        assert_eq!(decoder.stats().packets, 3);
    }

    #[test]
    fn invalid_frame_hidden_in_corrupt_payload_is_not_reported() {
        let mut bytes = vec![0xFF, 0x02, 0x03, 0x1b, 0xFF, 0x02, 0x00];
        for _ in 0..3 {
            bytes.extend_from_slice(&GOOD);
        }
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        assert_eq!(
            drain(&mut decoder, &mut transport),
            vec!["checksum_mismatch", "packet", "packet", "packet"]
        );
        assert_eq!(decoder.stats().failed_frames, 1);
    }

    #[test]
    fn good_frame_with_start_bytes_survives_corrupt_predecessor() {
        let good = Packet::new(0x01, 0xFF, vec![0xFF, 0xFF]);
        let mut bytes = wire(&[Packet::new(2, 0x1b, vec![0xFF, 0xFF, 0xFF])]);
        *bytes.last_mut().unwrap() ^= 0x01;
        bytes.extend_from_slice(&wire(std::slice::from_ref(&good)));
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        assert_eq!(
            decoder.decode_next(&mut transport).unwrap_err().kind(),
            FrameErrorKind::ChecksumMismatch
        );
        assert_eq!(decoder.decode_next(&mut transport).unwrap(), good);
        assert!(matches!(
            decoder.decode_next(&mut transport),
            Err(FrameError::StartNotFound { .. })
        ));
    }

    #[test]
    fn corrupt_frame_does_not_stall_live_link() {
        // Open link: no end of stream and no read timeout.
        let transport = MemoryTransport::new();
        transport.feed(&[0xFF, 0x02, 0x04, 0x1b, 0xFF, 0xFF, 0xFF, 0x00]);
        transport.feed(&GOOD);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut link = transport.clone();
        std::thread::spawn(move || {
            let mut decoder = FrameDecoder::new();
            for _ in 0..2 {
                let result = decoder.decode_next(&mut link);
                if tx.send(result).is_err() {
                    break;
                }
            }
        });

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.unwrap_err().kind(), FrameErrorKind::ChecksumMismatch);
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second.unwrap(), expected_packet());
        assert_eq!(transport.pending_input(), 0);

        transport.close_input();
    }

    #[test]
    fn roundtrip_all_message_types_and_lengths() {
        let mut decoder = FrameDecoder::new();
        for message_type in 0..=u8::MAX {
            let len = usize::from(message_type) % MAX_MESSAGE_LEN;
            let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31)).collect();
            let packet = Packet::new(message_type.wrapping_add(1), message_type, payload);

            let mut transport = MemoryTransport::from_bytes(&wire(std::slice::from_ref(&packet)));
            assert_eq!(decoder.decode_next(&mut transport).unwrap(), packet);
        }
        for len in 0..MAX_MESSAGE_LEN {
            let packet = Packet::new(0x01, 0xFF, vec![0xFF; len]);
            let mut transport = MemoryTransport::from_bytes(&wire(std::slice::from_ref(&packet)));
            assert_eq!(decoder.decode_next(&mut transport).unwrap(), packet);
        }
    }

    #[test]
    fn custom_checksum_is_honoured() {
        let config = FrameConfig::default().with_checksum(XorChecksum);
        let packet = Packet::new(3, 0x20, vec![9, 8, 7]);
        let mut buf = BytesMut::new();
        encode_packet(&packet, &config, &mut buf).unwrap();

        let mut transport = MemoryTransport::from_bytes(&buf);
        let mut decoder = FrameDecoder::with_config(config);
        assert_eq!(decoder.decode_next(&mut transport).unwrap(), packet);

        // Default checksum rejects the same bytes.
        let mut transport = MemoryTransport::from_bytes(&buf);
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            decoder.decode_next(&mut transport).unwrap_err().kind(),
            FrameErrorKind::ChecksumMismatch
        );
    }

    #[test]
    fn buffered_bytes_stay_bounded() {
        // Every frame claims the maximum length and is cut short by the next start byte.
        let mut bytes = Vec::new();
        for _ in 0..200 {
            bytes.extend_from_slice(&[0xFF, 0x01, 0xFF, 0x00, 0x00]);
        }
        let mut transport = MemoryTransport::from_bytes(&bytes);
        let mut decoder = FrameDecoder::new();

        let bound = HEADER_SIZE + MAX_MESSAGE_LEN + TRAILER_SIZE;
        loop {
            match decoder.decode_next(&mut transport) {
                Err(FrameError::StartNotFound { .. }) => break,
                Ok(_) => {}
                Err(_) => assert!(decoder.buffered() <= bound),
            }
        }
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut transport = MemoryTransport::from_bytes(&[0xFF, 2, 4, 0x1b]);
        let mut decoder = FrameDecoder::new();
        let _ = decoder.decode_next(&mut transport);
        assert!(decoder.buffered() > 0);

        decoder.reset();
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    struct FailingAfter {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Transport for FailingAfter {
        fn open(&mut self) -> serialframe_transport::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> serialframe_transport::Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn read(&mut self, buf: &mut [u8]) -> serialframe_transport::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }

        fn write(&mut self, buf: &[u8]) -> serialframe_transport::Result<usize> {
            Ok(buf.len())
        }

        fn try_clone(&self) -> serialframe_transport::Result<Self> {
            Err(TransportError::Closed)
        }
    }
}
