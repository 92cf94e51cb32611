//! Replay a PDI capture through the listener and print the layout state.
//!
//! Reads raw bytes captured from a Base serial link (or, with no argument,
//! uses a short built-in capture), pushes them through a [`Listener`] over a
//! mock transport, then lists every component the store learned about and
//! re-synthesizes the whole layout as PDI frames.
//!
//! Chunking is deliberately small so frames arrive split across reads,
//! the way they do on a real serial port.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=raillib=debug cargo run -p raillib --example replay_capture -- capture.bin
//! ```

use std::sync::Arc;

use raillib::pdi::KEEP_ALIVE;
use raillib::pdi::asc2::Asc2Req;
use raillib::pdi::base::{BASE_SYNTH_VALID, BaseInfo, BaseRecord, BaseReq};
use raillib::pdi::tmcc::TmccReq;
use raillib::state::ContextBuilder;
use raillib::{CommandId, CommandReq, Error, Listener, Scope, SwitchOp};
use raillib_test_harness::{MockCodec, MockTransport};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Serial reads rarely return more than this.
const CHUNK: usize = 7;

fn demo_capture(codec: &MockCodec) -> anyhow::Result<Vec<u8>> {
    let mut wire = Vec::new();
    let info = BaseInfo {
        firmware_high: Some(1),
        firmware_low: Some(62),
        throw_rate: Some(1.5),
        name: Some("Club Layout".into()),
    };
    wire.extend(BaseReq::with_record(0, BASE_SYNTH_VALID, BaseRecord::Base(info))?.as_bytes());
    wire.extend(KEEP_ALIVE);
    wire.extend(Asc2Req::relay(12, true, None)?.as_bytes());
    // Line noise between frames.
    wire.extend([0x00, 0x7F]);
    let out = CommandReq::build(CommandId::Switch(SwitchOp::Out), 4, None, None)?;
    wire.extend(TmccReq::from_command(&out, codec)?.as_bytes());
    let thru = CommandReq::build(CommandId::Switch(SwitchOp::Through), 5, None, None)?;
    wire.extend(TmccReq::from_command(&thru, codec)?.as_bytes());
    Ok(wire)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let codec = Arc::new(MockCodec::new());
    let capture = match std::env::args().nth(1) {
        Some(path) => {
            println!("Replaying {path}");
            std::fs::read(&path)?
        }
        None => {
            println!("Replaying built-in capture");
            demo_capture(&codec)?
        }
    };
    println!("{} bytes\n", capture.len());

    let mut mock = MockTransport::new().with_chunk_size(CHUNK).hang_up_when_drained();
    mock.feed(&capture);

    let ctx = ContextBuilder::new().build();
    let mut listener = Listener::new(Box::new(mock), Arc::clone(&ctx)).with_codec(codec.clone());

    // The mock hangs up once the capture is exhausted.
    match listener.run(CancellationToken::new()).await {
        Err(Error::ConnectionLost) | Ok(()) => {}
        Err(err) => return Err(err.into()),
    }

    let stats = listener.stats();
    println!(
        "frames: {}  pings: {}  bad: {}  undecodable: {}  applied: {}",
        stats.frames, stats.pings, stats.bad_frames, stats.undecodable, stats.applied
    );
    if !listener.pending().is_empty() {
        println!("{} trailing bytes never completed a frame", listener.pending().len());
    }
    println!();

    for scope in Scope::ALL {
        for handle in ctx.store().get_all(scope) {
            let state = handle.snapshot();
            let name = state.road_name().unwrap_or("-");
            println!("{scope:>8} {:>4}  {name}", handle.address());
            if let Some(base) = state.as_base() {
                if let Some(fw) = base.firmware() {
                    println!("          firmware {fw}");
                }
            }
            if let Some(sw) = state.as_switch() {
                println!("          thru: {:?}", sw.is_thru());
            }
            if let Some(acc) = state.as_accessory() {
                println!("          aux on: {}", acc.is_aux_on());
            }
        }
    }

    let resynth = ctx.store().as_bytes(codec.as_ref())?;
    println!("\nre-synthesized layout: {} bytes", resynth.len());
    Ok(())
}
