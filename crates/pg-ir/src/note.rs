//! Note values.

use core::fmt;
use core::str::FromStr;

use crate::field::{FieldValue, TokenError};

/// Lowest playable octave.
pub const MIN_OCTAVE: u8 = 2;

/// Highest playable octave.
pub const MAX_OCTAVE: u8 = 7;

/// Semitone spellings used in note tokens (`C-4`, `C#4`, ...).
const NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// A playable pitch, stored as a MIDI note number (60 = C-4, 69 = A-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note(u8);

impl Note {
    /// Lowest playable note (`C-2`).
    pub const MIN: Note = Note((MIN_OCTAVE + 1) * 12);
    /// Highest playable note (`B-7`).
    pub const MAX: Note = Note((MAX_OCTAVE + 1) * 12 + 11);

    /// Create a note from octave and semitone (0-11), if it is playable.
    pub const fn from_octave_semitone(octave: u8, semitone: u8) -> Option<Self> {
        if octave < MIN_OCTAVE || octave > MAX_OCTAVE || semitone > 11 {
            return None;
        }
        Some(Note((octave + 1) * 12 + semitone))
    }

    /// Create a note from a MIDI number, if it is playable.
    pub const fn from_midi(midi: u8) -> Option<Self> {
        if midi < Self::MIN.0 || midi > Self::MAX.0 {
            None
        } else {
            Some(Note(midi))
        }
    }

    /// MIDI note number.
    pub const fn midi(self) -> u8 {
        self.0
    }

    /// Octave (2-7).
    pub const fn octave(self) -> u8 {
        self.0 / 12 - 1
    }

    /// Semitone within the octave (0-11).
    pub const fn semitone(self) -> u8 {
        self.0 % 12
    }
}

impl FieldValue for Note {
    const WIDTH: usize = 3;
    const NAME: &'static str = "note";
}

impl FromStr for Note {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TokenError::new(Self::NAME, s);
        if s.len() != Self::WIDTH || !s.is_ascii() {
            return Err(err());
        }
        let semitone = NAMES
            .iter()
            .position(|name| *name == &s[..2])
            .ok_or_else(err)?;
        let octave = s.as_bytes()[2]
            .checked_sub(b'0')
            .filter(|d| *d <= 9)
            .ok_or_else(err)?;
        Note::from_octave_semitone(octave, semitone as u8).ok_or_else(err)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMES[self.semitone() as usize], self.octave())
    }
}
