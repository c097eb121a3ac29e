use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("serialframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: serialframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: engine={}, cli=true",
        cfg!(feature = "engine")
    );
    println!(
        "frame: start=0x{:02x}, max_message_len={}, checksum=sum|xor",
        serialframe_frame::START_BYTE,
        serialframe_frame::MAX_MESSAGE_LEN
    );

    Ok(SUCCESS)
}
