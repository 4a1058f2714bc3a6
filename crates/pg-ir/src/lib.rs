//! Song data model for the pulsegrid tracker.
//!
//! Patterns, cells and their field tokens live here. The playback engine
//! reads patterns through these types; editors write them through the
//! token parsers.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod cell;
mod channel;
mod field;
mod note;
mod params;
mod pattern;
mod pattern_table;

pub use cell::{Cell, CellField, FieldError, NoiseCell, PulseCell, Token, WaveCell};
pub use channel::{ChannelKind, NUM_CHANNELS};
pub use field::{
    continue_sentinel, Field, FieldValue, NoteField, TokenError, CONTINUE_2, CONTINUE_3, OFF,
};
pub use note::{Note, MAX_OCTAVE, MIN_OCTAVE};
pub use params::{Direction, DutyCycle, Envelope, Rate, Sweep, Volume, WaveVolume, Waveform};
pub use pattern::{
    pattern_name, Pattern, PatternId, PatternName, ShapeMismatch, ROWS_PER_BEAT, ROWS_PER_PATTERN,
};
pub use pattern_table::{PatternMeta, PatternTable, MAX_PATTERNS};
