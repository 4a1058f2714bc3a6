//! pulsegrid CLI: plays a built-in demo song and prints the playhead.
//!
//! Usage:
//!   cargo run --bin pg-cli
//!   cargo run --bin pg-cli -- --bpm 140 --seconds 8 --null
//!
//! `--null` renders into a paced null sink instead of the audio device.
//! Set `RUST_LOG=debug` for engine logs.

use pg_ir::{CellField, ChannelKind};
use pg_master::{
    Backend, Controller, ControllerError, EngineEvent, PlayOptions, PlaybackState, Topic,
};
use std::env;
use std::io::Write;
use std::time::{Duration, Instant};

/// (row, channel, field, token) edits making up the demo pattern.
const DEMO: &[(usize, ChannelKind, CellField, &str)] = &[
    (0, ChannelKind::Pulse1, CellField::Note, "C-4"),
    (0, ChannelKind::Pulse1, CellField::DutyCycle, "25"),
    (4, ChannelKind::Pulse1, CellField::Note, "E-4"),
    (8, ChannelKind::Pulse1, CellField::Note, "G-4"),
    (12, ChannelKind::Pulse1, CellField::Note, "C-5"),
    (14, ChannelKind::Pulse1, CellField::Note, "OFF"),
    (0, ChannelKind::Pulse2, CellField::Note, "C-3"),
    (0, ChannelKind::Pulse2, CellField::Volume, "08"),
    (8, ChannelKind::Pulse2, CellField::Note, "G-2"),
    (0, ChannelKind::Wave, CellField::Note, "C-2"),
    (0, ChannelKind::Wave, CellField::Waveform, "TRI"),
    (8, ChannelKind::Wave, CellField::Note, "G-2"),
    (0, ChannelKind::Noise, CellField::Rate, "40"),
    (0, ChannelKind::Noise, CellField::Volume, "06"),
    (2, ChannelKind::Noise, CellField::Volume, "00"),
    (8, ChannelKind::Noise, CellField::Volume, "06"),
    (10, ChannelKind::Noise, CellField::Volume, "00"),
];

struct Args {
    bpm: f64,
    seconds: u64,
    backend: Backend,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse::<f64>().ok())
    };
    Args {
        bpm: value_of("--bpm").unwrap_or(120.0),
        seconds: value_of("--seconds").map_or(4, |s| s.max(0.0) as u64),
        backend: if args.iter().any(|a| a == "--null") { Backend::Null } else { Backend::Device },
    }
}

fn build_demo(ctrl: &Controller) -> Result<(), ControllerError> {
    for &(row, channel, field, token) in DEMO {
        ctrl.set_cell_field(row, channel, field, token)?;
    }
    Ok(())
}

fn run(args: Args) -> Result<(), ControllerError> {
    let ctrl = Controller::new(Default::default(), args.backend)?;
    build_demo(&ctrl)?;
    let bpm = ctrl.set_bpm(args.bpm);

    let _playhead = ctrl.subscribe(Topic::PlayedRow, |event| {
        if let EngineEvent::PlayedRow { row, time, .. } = event {
            print!("\rRow: {:02} | {:7.3}s", row, time);
            std::io::stdout().flush()?;
        }
        Ok(())
    });

    println!("Playing demo at {} BPM for {}s...", bpm, args.seconds);
    log::debug!("demo pattern built from {} edits", DEMO.len());
    ctrl.play(PlayOptions::new().rows(0, 15).looping(true))?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    while ctrl.state() != PlaybackState::Stopped && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    ctrl.stop().ok();

    println!("\rDone.                  ");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(parse_args()) {
        eprintln!("pg-cli: {}", e);
        std::process::exit(1);
    }
}
