//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::render()` does not allocate. The
//! scheduler tick runs outside the guard, as it does on the host's
//! scheduler thread; only the render call is checked.
//!
//! Just run `cargo test` — no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use pg_engine::{Engine, EngineConfig, Frame, PlayOptions};
use pg_ir::{CellField, ChannelKind};

/// Fill the current pattern with notes and parameter changes on every
/// channel, so rendering crosses plenty of automation points.
fn busy_engine(bpm: f64) -> Engine {
    let mut engine = Engine::new(EngineConfig::default().with_bpm(bpm));
    let pattern = engine.current_pattern();
    let notes = ["C-4", "E-4", "G-4", "OFF"];
    let duties = ["12", "25", "50", "75"];
    let waves = ["SIN", "SQR", "SAW", "TRI"];
    for row in 0..64 {
        let i = row % 4;
        let edits = [
            (ChannelKind::Pulse1, CellField::Note, notes[i]),
            (ChannelKind::Pulse1, CellField::DutyCycle, duties[i]),
            (ChannelKind::Pulse2, CellField::Note, notes[(i + 1) % 4]),
            (ChannelKind::Wave, CellField::Note, notes[(i + 2) % 4]),
            (ChannelKind::Wave, CellField::Waveform, waves[i]),
            (ChannelKind::Noise, CellField::Rate, "25"),
        ];
        for (channel, field, token) in edits {
            engine.set_cell_field(pattern, channel, row, field, token).unwrap();
        }
    }
    engine
}

/// Play for `seconds`, ticking outside the guard and rendering inside it.
fn assert_render_alloc_free(mut engine: Engine, options: PlayOptions, seconds: usize) {
    engine.play(options).unwrap();
    let mut block = vec![Frame::silence(); 256];
    let blocks = seconds * engine.sample_rate() as usize / block.len();
    for _ in 0..blocks {
        engine.tick();
        assert_no_alloc(|| engine.render(&mut block));
    }
}

#[test]
fn looping_pattern_alloc_free() {
    assert_render_alloc_free(busy_engine(300.0), PlayOptions::new().looping(true), 5);
}

#[test]
fn song_mode_alloc_free() {
    let mut engine = busy_engine(240.0);
    let first = engine.current_pattern();
    engine.create_pattern(None).unwrap();
    engine.append_to_order(first).unwrap();
    assert_render_alloc_free(engine, PlayOptions::song().looping(true), 5);
}

#[test]
fn stop_and_pause_render_alloc_free() {
    let mut engine = busy_engine(180.0);
    let mut block = vec![Frame::silence(); 256];
    engine.play(PlayOptions::new()).unwrap();
    engine.tick();
    assert_no_alloc(|| engine.render(&mut block));

    engine.pause().unwrap();
    assert_no_alloc(|| engine.render(&mut block));
    engine.resume().unwrap();
    engine.stop().unwrap();
    assert_no_alloc(|| engine.render(&mut block));
}
