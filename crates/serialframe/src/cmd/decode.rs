use serialframe_frame::{FrameDecoder, FrameError};
use serialframe_transport::{FileTransport, Transport};
use tracing::{debug, info};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, transport_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame_error, print_packet, print_summary, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut transport = FileTransport::read_only(&args.file);
    transport
        .open()
        .map_err(|err| transport_error("open failed", err))?;

    let mut decoder = FrameDecoder::with_config(args.frame.frame_config());
    loop {
        match decoder.decode_next(&mut transport) {
            Ok(packet) => print_packet(&packet, format),
            Err(FrameError::StartNotFound { skipped }) => {
                debug!(skipped, "end of capture");
                break;
            }
            Err(err) if err.is_fatal() => return Err(frame_error("read failed", err)),
            Err(err) => print_frame_error(&err, format),
        }
    }

    let stats = decoder.stats();
    info!(?stats, file = %args.file.display(), "capture decoded");
    print_summary(&stats, format);

    if args.strict && stats.failed_frames > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
