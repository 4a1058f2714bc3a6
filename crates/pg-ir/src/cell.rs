//! Cell records, one shape per channel kind.

use core::fmt::{self, Write};

use arrayvec::ArrayString;

use crate::channel::ChannelKind;
use crate::field::{Field, FieldValue, NoteField, TokenError};
use crate::params::{DutyCycle, Envelope, Rate, Sweep, Volume, WaveVolume, Waveform};

/// A pulse channel cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PulseCell {
    pub note: NoteField,
    pub volume: Field<Volume>,
    pub duty_cycle: Field<DutyCycle>,
    pub envelope: Field<Envelope>,
    pub sweep: Field<Sweep>,
}

/// A wave channel cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WaveCell {
    pub note: NoteField,
    pub volume: Field<WaveVolume>,
    pub waveform: Field<Waveform>,
}

/// A noise channel cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoiseCell {
    pub rate: Field<Rate>,
    pub volume: Field<Volume>,
    pub envelope: Field<Envelope>,
}

/// One channel's instruction at one row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    Pulse(PulseCell),
    Wave(WaveCell),
    Noise(NoiseCell),
}

/// Addressable field of a cell, used by field-level edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellField {
    Note,
    Volume,
    DutyCycle,
    Envelope,
    Sweep,
    Waveform,
    Rate,
}

/// A field-level edit that cannot be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// The channel's cell has no such field.
    Unsupported { field: CellField, channel: ChannelKind },
    /// The token is not legal for the field.
    Token(TokenError),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Unsupported { field, channel } => {
                write!(f, "{} cells have no {:?} field", channel, field)
            }
            FieldError::Token(err) => fmt::Display::fmt(err, f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FieldError {}

impl From<TokenError> for FieldError {
    fn from(err: TokenError) -> Self {
        FieldError::Token(err)
    }
}

/// Encoded field token; the widest token is three characters.
pub type Token = ArrayString<3>;

fn encode(value: &impl fmt::Display) -> Token {
    let mut token = Token::new();
    // Every field encodes to at most three ASCII characters.
    let _ = write!(token, "{}", value);
    token
}

impl Cell {
    /// An all-continue cell for the given channel.
    pub fn empty(channel: ChannelKind) -> Self {
        match channel {
            ChannelKind::Pulse1 | ChannelKind::Pulse2 => Cell::Pulse(PulseCell::default()),
            ChannelKind::Wave => Cell::Wave(WaveCell::default()),
            ChannelKind::Noise => Cell::Noise(NoiseCell::default()),
        }
    }

    /// True if this cell's shape belongs on `channel`.
    pub fn fits(&self, channel: ChannelKind) -> bool {
        matches!(
            (self, channel),
            (Cell::Pulse(_), ChannelKind::Pulse1 | ChannelKind::Pulse2)
                | (Cell::Wave(_), ChannelKind::Wave)
                | (Cell::Noise(_), ChannelKind::Noise)
        )
    }

    /// Returns true if every field continues.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Pulse(c) => *c == PulseCell::default(),
            Cell::Wave(c) => *c == WaveCell::default(),
            Cell::Noise(c) => *c == NoiseCell::default(),
        }
    }

    /// Parse `token` and store it in `field`.
    ///
    /// `channel` only labels the error when the field is unsupported.
    pub fn set_field(
        &mut self,
        channel: ChannelKind,
        field: CellField,
        token: &str,
    ) -> Result<(), FieldError> {
        match (self, field) {
            (Cell::Pulse(c), CellField::Note) => c.note = token.parse()?,
            (Cell::Pulse(c), CellField::Volume) => c.volume = token.parse()?,
            (Cell::Pulse(c), CellField::DutyCycle) => c.duty_cycle = token.parse()?,
            (Cell::Pulse(c), CellField::Envelope) => c.envelope = token.parse()?,
            (Cell::Pulse(c), CellField::Sweep) => c.sweep = token.parse()?,
            (Cell::Wave(c), CellField::Note) => c.note = token.parse()?,
            (Cell::Wave(c), CellField::Volume) => c.volume = token.parse()?,
            (Cell::Wave(c), CellField::Waveform) => c.waveform = token.parse()?,
            (Cell::Noise(c), CellField::Rate) => c.rate = token.parse()?,
            (Cell::Noise(c), CellField::Volume) => c.volume = token.parse()?,
            (Cell::Noise(c), CellField::Envelope) => c.envelope = token.parse()?,
            _ => return Err(FieldError::Unsupported { field, channel }),
        }
        Ok(())
    }

    /// Encoded token of `field`, or `None` if the cell has no such field.
    pub fn field_token(&self, field: CellField) -> Option<Token> {
        let token = match (self, field) {
            (Cell::Pulse(c), CellField::Note) => encode(&c.note),
            (Cell::Pulse(c), CellField::Volume) => encode(&c.volume),
            (Cell::Pulse(c), CellField::DutyCycle) => encode(&c.duty_cycle),
            (Cell::Pulse(c), CellField::Envelope) => encode(&c.envelope),
            (Cell::Pulse(c), CellField::Sweep) => encode(&c.sweep),
            (Cell::Wave(c), CellField::Note) => encode(&c.note),
            (Cell::Wave(c), CellField::Volume) => encode(&c.volume),
            (Cell::Wave(c), CellField::Waveform) => encode(&c.waveform),
            (Cell::Noise(c), CellField::Rate) => encode(&c.rate),
            (Cell::Noise(c), CellField::Volume) => encode(&c.volume),
            (Cell::Noise(c), CellField::Envelope) => encode(&c.envelope),
            _ => return None,
        };
        Some(token)
    }
}

impl CellField {
    /// Token width of this field.
    pub const fn width(self, channel: ChannelKind) -> usize {
        match self {
            CellField::Note => 3,
            CellField::Volume => match channel {
                ChannelKind::Wave => WaveVolume::WIDTH,
                _ => Volume::WIDTH,
            },
            CellField::DutyCycle => DutyCycle::WIDTH,
            CellField::Envelope => Envelope::WIDTH,
            CellField::Sweep => Sweep::WIDTH,
            CellField::Waveform => Waveform::WIDTH,
            CellField::Rate => Rate::WIDTH,
        }
    }
}

impl From<PulseCell> for Cell {
    fn from(cell: PulseCell) -> Self {
        Cell::Pulse(cell)
    }
}

impl From<WaveCell> for Cell {
    fn from(cell: WaveCell) -> Self {
        Cell::Wave(cell)
    }
}

impl From<NoiseCell> for Cell {
    fn from(cell: NoiseCell) -> Self {
        Cell::Noise(cell)
    }
}
