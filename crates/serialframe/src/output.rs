use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialframe_frame::{DecoderStats, FrameError, Packet};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    event: &'static str,
    address: u8,
    message_type: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameErrorOutput {
    event: &'static str,
    kind: &'static str,
    message: String,
    timestamp: String,
}

#[derive(Serialize)]
struct WireOutput {
    address: u8,
    message_type: u8,
    length: u8,
    checksum: u8,
    wire: String,
}

#[derive(Serialize)]
struct SummaryOutput {
    event: &'static str,
    packets: u64,
    failed_frames: u64,
    skipped_bytes: u64,
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                event: "packet",
                address: packet.address(),
                message_type: packet.message_type(),
                payload_size: packet.payload().len(),
                payload: hex::encode(packet.payload()),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["EVENT", "ADDRESS", "TYPE", "SIZE", "PAYLOAD"]);
            table.add_row(vec![
                "packet".to_string(),
                format!("{:#04x}", packet.address()),
                format!("{:#04x}", packet.message_type()),
                packet.payload().len().to_string(),
                hex::encode(packet.payload()),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet address={:#04x} type={:#04x} size={} payload={}",
                packet.address(),
                packet.message_type(),
                packet.payload().len(),
                hex::encode(packet.payload())
            );
        }
        OutputFormat::Raw => print_raw(packet.payload()),
    }
}

pub fn print_frame_error(err: &FrameError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameErrorOutput {
                event: "frame_error",
                kind: err.kind().as_str(),
                message: err.to_string(),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["EVENT", "KIND", "DETAIL"]);
            table.add_row(vec![
                "frame_error".to_string(),
                err.kind().to_string(),
                err.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("frame_error kind={} {err}", err.kind()),
        // Raw output carries payload bytes only.
        OutputFormat::Raw => {}
    }
}

/// Print an encoded frame (`0xFF | address | length | message | checksum`).
pub fn print_wire(wire: &[u8], format: OutputFormat) {
    let Some((&checksum, head)) = wire.split_last() else {
        return;
    };
    let out = WireOutput {
        address: head.get(1).copied().unwrap_or_default(),
        length: head.get(2).copied().unwrap_or_default(),
        message_type: head.get(3).copied().unwrap_or_default(),
        checksum,
        wire: hex::encode(wire),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "TYPE", "LENGTH", "CHECKSUM", "WIRE"]);
            table.add_row(vec![
                format!("{:#04x}", out.address),
                format!("{:#04x}", out.message_type),
                out.length.to_string(),
                format!("{:#04x}", out.checksum),
                out.wire.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.wire),
        OutputFormat::Raw => print_raw(wire),
    }
}

/// Print decoder totals. Table and pretty output go to stderr so stdout stays
/// one record per event.
pub fn print_summary(stats: &DecoderStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            event: "summary",
            packets: stats.packets,
            failed_frames: stats.failed_frames,
            skipped_bytes: stats.skipped_bytes,
        }),
        OutputFormat::Table | OutputFormat::Pretty => eprintln!(
            "packets={} failed_frames={} skipped_bytes={}",
            stats.packets, stats.failed_frames, stats.skipped_bytes
        ),
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
