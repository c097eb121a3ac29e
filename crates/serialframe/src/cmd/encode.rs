use serialframe_frame::FrameEncoder;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let packet = args.packet.packet()?;
    let mut encoder = FrameEncoder::with_config(args.frame.frame_config());
    let wire = encoder
        .encode(&packet)
        .map_err(|err| frame_error("encode failed", err))?;
    print_wire(wire, format);
    Ok(SUCCESS)
}
