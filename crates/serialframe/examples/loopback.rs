//! Loopback demo: a simulated device streams frames, some corrupted, into an
//! engine and the consumer prints what comes out.
//!
//! Run with:
//!   cargo run --example loopback

use std::thread;
use std::time::Duration;

use serialframe::engine::{Engine, Event};
use serialframe::frame::{FrameConfig, FrameEncoder, Packet};
use serialframe::transport::MemoryTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = MemoryTransport::new();
    let device = transport.clone();
    let handle = Engine::new(transport).spawn()?;

    let producer = thread::spawn(move || {
        let mut encoder = FrameEncoder::with_config(FrameConfig::default());
        for seq in 0u8..8 {
            let packet = Packet::new(0x02, 0x1b, vec![seq, seq, seq]);
            let Ok(wire) = encoder.encode(&packet) else {
                continue;
            };
            let mut wire = wire.to_vec();
            // Every third frame gets a flipped payload bit.
            if seq % 3 == 2 {
                wire[4] ^= 0x01;
            }
            device.feed(&wire);
            thread::sleep(Duration::from_millis(20));
        }
        device.close_input();
    });

    while let Some(event) = handle.recv_event() {
        match event {
            Event::Packet(packet) => eprintln!(
                "packet addr={:#04x} type={:#04x} payload={:?}",
                packet.address(),
                packet.message_type(),
                packet.payload().as_ref()
            ),
            Event::Error(err) => eprintln!("frame error: {err}"),
        }
    }

    let _ = producer.join();
    eprintln!("engine stopped: {:?}", handle.join()?);
    Ok(())
}
