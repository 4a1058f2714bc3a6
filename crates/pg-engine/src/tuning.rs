//! Pitch, gain and rate lookup.
//!
//! Every decoder here is total: input outside the legal set resolves to a
//! safe value (silence) and is reported through `log`, never a panic. They
//! run while rows are being scheduled.

use pg_ir::{Note, Rate, Volume, WaveVolume};

/// Reference pitch for A-4.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI number of A-4.
const A4_MIDI: i32 = 69;

/// Number of discrete volume steps (`00`-`15`).
pub const VOLUME_STEPS: u8 = 16;

/// Frequency of a note in 12-tone equal temperament.
pub fn note_frequency(note: Note) -> f32 {
    let semitones = note.midi() as i32 - A4_MIDI;
    A4_FREQUENCY * libm::powf(2.0, semitones as f32 / 12.0)
}

/// Frequency of a note token such as `"A-4"`; 0.0 for anything else.
pub fn decode_note(token: &str) -> f32 {
    match token.parse::<Note>() {
        Ok(note) => note_frequency(note),
        Err(err) => {
            log::warn!("{}, resolving to silence", err);
            0.0
        }
    }
}

/// Linear gain of a volume level: `level / 15`.
pub fn volume_gain(volume: Volume) -> f32 {
    volume.level() as f32 / Volume::MAX.level() as f32
}

/// Gain of a raw volume level; out-of-range levels are silent.
pub fn decode_volume(level: u8) -> f32 {
    match Volume::new(level) {
        Some(volume) => volume_gain(volume),
        None => {
            log::warn!("volume level {} out of range, resolving to silence", level);
            0.0
        }
    }
}

/// Gain of the wave channel's coarse volume.
pub fn wave_volume_gain(volume: WaveVolume) -> f32 {
    match volume {
        WaveVolume::Off => 0.0,
        WaveVolume::Low => 0.25,
        WaveVolume::Mid => 0.5,
        WaveVolume::High => 1.0,
    }
}

/// Playback-rate multiplier of a rate token (`"00"`-`"99"` → 0.0-9.9).
pub fn decode_rate(token: &str) -> f32 {
    match token.parse::<Rate>() {
        Ok(rate) => rate.multiplier(),
        Err(err) => {
            log::warn!("{}, resolving to rate 0", err);
            0.0
        }
    }
}
