use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use serialframe_frame::{FrameConfig, Packet, TwosComplementSum, XorChecksum};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames from a device and print packets and frame errors.
    Listen(ListenArgs),
    /// Encode one packet and write it to a device.
    Send(SendArgs),
    /// Decode a capture file offline.
    Decode(DecodeArgs),
    /// Print the wire bytes for one packet.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ChecksumKind {
    /// Two's-complement sum over every frame byte.
    #[default]
    Sum,
    /// XOR over every frame byte.
    Xor,
}

/// Frame codec options shared by every command.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Largest accepted message length (type byte plus payload).
    #[arg(long, value_name = "BYTES", default_value_t = u8::MAX, value_parser = clap::value_parser!(u8).range(1..))]
    pub max_len: u8,
    /// Checksum algorithm.
    #[arg(long, value_enum, default_value_t = ChecksumKind::Sum)]
    pub checksum: ChecksumKind,
}

impl FrameArgs {
    pub fn frame_config(&self) -> FrameConfig {
        let config = FrameConfig::default().with_max_message_len(usize::from(self.max_len));
        match self.checksum {
            ChecksumKind::Sum => config.with_checksum(TwosComplementSum),
            ChecksumKind::Xor => config.with_checksum(XorChecksum),
        }
    }
}

/// The packet to encode.
#[derive(Args, Debug)]
pub struct PacketArgs {
    /// Destination address (decimal or 0x-prefixed hex).
    #[arg(long, short = 'a', value_parser = parse_byte)]
    pub address: u8,
    /// Message type (decimal or 0x-prefixed hex).
    #[arg(long = "type", short = 't', value_parser = parse_byte)]
    pub message_type: u8,
    /// Payload as hex, e.g. 010101.
    #[arg(long, short = 'p', default_value = "")]
    pub payload: String,
}

impl PacketArgs {
    pub fn packet(&self) -> CliResult<Packet> {
        let payload = hex::decode(self.payload.trim())
            .map_err(|err| CliError::new(USAGE, format!("--payload is not valid hex: {err}")))?;
        Ok(Packet::new(self.address, self.message_type, payload))
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device or file to read from.
    pub device: PathBuf,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Keep polling at end of stream instead of exiting (e.g. 100ms).
    #[arg(long, value_name = "INTERVAL")]
    pub follow: Option<String>,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device to write to.
    pub device: PathBuf,
    #[command(flatten)]
    pub packet: PacketArgs,
    /// Wait for one response packet and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file with raw link bytes.
    pub file: PathBuf,
    /// Exit with DATA_INVALID if any frame failed.
    #[arg(long)]
    pub strict: bool,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub packet: PacketArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|_| format!("expected a byte (0-255 or 0x00-0xff), got {input:?}"))
}
