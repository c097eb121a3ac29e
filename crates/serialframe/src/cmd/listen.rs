use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serialframe_engine::{Engine, EngineConfig, EngineHandle, Event};
use serialframe_transport::FileTransport;
use tracing::{debug, info};

use crate::cmd::send::parse_duration;
use crate::cmd::ListenArgs;
use crate::exit::{engine_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame_error, print_packet, OutputFormat};

const EVENT_POLL: Duration = Duration::from_millis(200);
const STOP_GRACE: Duration = Duration::from_secs(1);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = EngineConfig {
        frame: args.frame.frame_config(),
        eof_retry: args.follow.as_deref().map(parse_duration).transpose()?,
        thread_name: "serialframe-listen".to_string(),
        ..EngineConfig::default()
    };
    let handle = Engine::with_config(FileTransport::read_only(&args.device), config)
        .spawn()
        .map_err(|err| engine_error("start failed", err))?;
    info!(device = %args.device.display(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match handle.recv_event_timeout(EVENT_POLL) {
            Some(Event::Packet(packet)) => {
                print_packet(&packet, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Some(Event::Error(err)) => print_frame_error(&err, format),
            None if handle.is_finished() => break,
            None => {}
        }
    }

    stop(handle)
}

/// Cancel the engine and collect its result.
///
/// A read blocked on an idle device cannot be interrupted; after a short
/// grace period the engine thread is left to die with the process.
fn stop(handle: EngineHandle) -> CliResult<i32> {
    handle.cancel();
    let deadline = Instant::now() + STOP_GRACE;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if !handle.is_finished() {
        debug!("engine still blocked on read; exiting without join");
        return Ok(SUCCESS);
    }

    let termination = handle
        .join()
        .map_err(|err| engine_error("listen failed", err))?;
    debug!(?termination, "engine stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
