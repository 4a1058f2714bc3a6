//! Pattern type: four fixed-length cell columns.

use core::fmt;

use arrayvec::ArrayString;

use crate::cell::{Cell, NoiseCell, PulseCell, WaveCell};
use crate::channel::ChannelKind;

/// Rows in every pattern.
pub const ROWS_PER_PATTERN: usize = 64;

/// Rows per beat (4 rows = 1 beat).
pub const ROWS_PER_BEAT: usize = 4;

/// Pattern display name.
pub type PatternName = ArrayString<32>;

slotmap::new_key_type! {
    /// Opaque identity of a pattern in the pattern table.
    pub struct PatternId;
}

/// Build a name from `s`, truncated on a char boundary to fit.
pub fn pattern_name(s: &str) -> PatternName {
    let mut name = PatternName::new();
    for c in s.chars() {
        if name.try_push(c).is_err() {
            break;
        }
    }
    name
}

/// A cell whose shape does not belong on the channel it was written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub channel: ChannelKind,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell shape does not fit the {} channel", self.channel)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShapeMismatch {}

/// A fixed-length grid of cells across the four channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    id: PatternId,
    name: PatternName,
    pulse1: [PulseCell; ROWS_PER_PATTERN],
    pulse2: [PulseCell; ROWS_PER_PATTERN],
    wave: [WaveCell; ROWS_PER_PATTERN],
    noise: [NoiseCell; ROWS_PER_PATTERN],
}

impl Pattern {
    /// Create a pattern with all-continue cells.
    pub fn new(id: PatternId, name: &str) -> Self {
        Self {
            id,
            name: pattern_name(name),
            pulse1: [PulseCell::default(); ROWS_PER_PATTERN],
            pulse2: [PulseCell::default(); ROWS_PER_PATTERN],
            wave: [WaveCell::default(); ROWS_PER_PATTERN],
            noise: [NoiseCell::default(); ROWS_PER_PATTERN],
        }
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = pattern_name(name);
    }

    /// Number of rows (always `ROWS_PER_PATTERN`).
    pub const fn rows(&self) -> usize {
        ROWS_PER_PATTERN
    }

    /// Get a cell.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn cell(&self, channel: ChannelKind, row: usize) -> Cell {
        assert!(row < ROWS_PER_PATTERN, "row {} out of range", row);
        match channel {
            ChannelKind::Pulse1 => Cell::Pulse(self.pulse1[row]),
            ChannelKind::Pulse2 => Cell::Pulse(self.pulse2[row]),
            ChannelKind::Wave => Cell::Wave(self.wave[row]),
            ChannelKind::Noise => Cell::Noise(self.noise[row]),
        }
    }

    /// Replace a cell. The cell's shape must match the channel.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn set_cell(
        &mut self,
        channel: ChannelKind,
        row: usize,
        cell: Cell,
    ) -> Result<(), ShapeMismatch> {
        assert!(row < ROWS_PER_PATTERN, "row {} out of range", row);
        match (channel, cell) {
            (ChannelKind::Pulse1, Cell::Pulse(c)) => self.pulse1[row] = c,
            (ChannelKind::Pulse2, Cell::Pulse(c)) => self.pulse2[row] = c,
            (ChannelKind::Wave, Cell::Wave(c)) => self.wave[row] = c,
            (ChannelKind::Noise, Cell::Noise(c)) => self.noise[row] = c,
            _ => return Err(ShapeMismatch { channel }),
        }
        Ok(())
    }

    /// Returns true if every cell in the pattern continues.
    pub fn is_empty(&self) -> bool {
        (0..ROWS_PER_PATTERN)
            .all(|row| ChannelKind::ALL.iter().all(|ch| self.cell(*ch, row).is_empty()))
    }
}
