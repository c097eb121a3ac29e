use std::time::{Duration, Instant};

use serialframe_engine::{Engine, EngineConfig, EngineHandle, Event};
use serialframe_frame::{FrameError, Packet};
use serialframe_transport::FileTransport;
use tracing::{debug, info};

use crate::cmd::SendArgs;
use crate::exit::{
    engine_error, frame_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_frame_error, print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let packet = args.packet.packet()?;
    let config = EngineConfig {
        frame: args.frame.frame_config(),
        thread_name: "serialframe-send".to_string(),
        ..EngineConfig::default()
    };
    let mut engine = Engine::with_config(FileTransport::new(&args.device), config);

    if !args.wait {
        engine
            .write(&packet)
            .map_err(|err| engine_error("send failed", err))?;
        info!(device = %args.device.display(), size = packet.wire_size(), "packet sent");
        return Ok(SUCCESS);
    }

    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let handle = engine
        .spawn()
        .map_err(|err| engine_error("start failed", err))?;
    handle
        .send(packet)
        .map_err(|err| engine_error("send failed", err))?;

    match wait_for_response(&handle, wait_timeout) {
        Response::Packet(packet) => {
            print_packet(&packet, format);
            handle.cancel();
            Ok(SUCCESS)
        }
        Response::Rejected(err) => {
            print_frame_error(&err, format);
            handle.cancel();
            Err(frame_error("send failed", err))
        }
        Response::Closed => {
            let termination = handle
                .join()
                .map_err(|err| engine_error("receive failed", err))?;
            Err(CliError::new(
                FAILURE,
                format!("no response before engine stopped ({termination:?})"),
            ))
        }
        Response::TimedOut => {
            handle.cancel();
            Err(CliError::new(
                TIMEOUT,
                format!("no response within {wait_timeout:?}"),
            ))
        }
    }
}

enum Response {
    Packet(Packet),
    /// The outbound packet could not be framed.
    Rejected(FrameError),
    Closed,
    TimedOut,
}

trait EventSource {
    fn next_event(&self, timeout: Duration) -> Option<Event>;
    fn finished(&self) -> bool;
}

impl EventSource for EngineHandle {
    fn next_event(&self, timeout: Duration) -> Option<Event> {
        self.recv_event_timeout(timeout)
    }

    fn finished(&self) -> bool {
        self.is_finished()
    }
}

/// Wait for the first response packet, skipping inbound frame errors.
fn wait_for_response<S: EventSource>(source: &S, timeout: Duration) -> Response {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Response::TimedOut;
        }
        match source.next_event(remaining) {
            Some(Event::Packet(packet)) => return Response::Packet(packet),
            Some(Event::Error(err @ FrameError::FrameTooLarge { .. })) => {
                return Response::Rejected(err)
            }
            Some(Event::Error(err)) => {
                debug!(error = %err, "ignoring frame error while waiting");
            }
            None if source.finished() => return Response::Closed,
            None => {}
        }
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    struct Scripted {
        events: RefCell<VecDeque<Option<Event>>>,
        finished: bool,
    }

    impl Scripted {
        fn new(events: Vec<Option<Event>>, finished: bool) -> Self {
            Self {
                events: RefCell::new(events.into()),
                finished,
            }
        }
    }

    impl EventSource for Scripted {
        fn next_event(&self, _timeout: Duration) -> Option<Event> {
            self.events.borrow_mut().pop_front().flatten()
        }

        fn finished(&self) -> bool {
            self.finished
        }
    }

    #[test]
    fn wait_for_response_skips_inbound_frame_errors() {
        let source = Scripted::new(
            vec![
                Some(Event::Error(FrameError::StartNotFound { skipped: 0 })),
                None,
                Some(Event::Packet(Packet::new(2, 0x1b, vec![1]))),
            ],
            false,
        );
        match wait_for_response(&source, Duration::from_secs(5)) {
            Response::Packet(packet) => assert_eq!(packet.message_type(), 0x1b),
            _ => panic!("expected a packet"),
        }
    }

    #[test]
    fn wait_for_response_reports_rejected_packet() {
        let source = Scripted::new(
            vec![Some(Event::Error(FrameError::FrameTooLarge {
                size: 300,
                max: 255,
            }))],
            false,
        );
        assert!(matches!(
            wait_for_response(&source, Duration::from_secs(5)),
            Response::Rejected(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn wait_for_response_notices_stopped_engine() {
        let source = Scripted::new(Vec::new(), true);
        assert!(matches!(
            wait_for_response(&source, Duration::from_secs(5)),
            Response::Closed
        ));
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }
}
