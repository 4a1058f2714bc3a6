//! Tagged cell fields and their fixed-width token encoding.
//!
//! Inside the engine every field is a tagged value. The compact string form
//! (`"C-4"`, `"--"`, `"OFF"`) only exists at the editor boundary, through
//! `FromStr` and `Display`.

use core::fmt;
use core::str::FromStr;

use arrayvec::ArrayString;

use crate::note::Note;

/// Continue sentinel for 2-character fields.
pub const CONTINUE_2: &str = "--";

/// Continue sentinel for 3-character fields.
pub const CONTINUE_3: &str = "---";

/// Off sentinel, note field only.
pub const OFF: &str = "OFF";

/// Continue sentinel for a field of the given width.
pub const fn continue_sentinel(width: usize) -> &'static str {
    if width == 2 {
        CONTINUE_2
    } else {
        CONTINUE_3
    }
}

/// A token that is not legal for the field it was written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenError {
    field: &'static str,
    token: ArrayString<8>,
}

impl TokenError {
    /// Create an error for `token` written to `field`.
    pub fn new(field: &'static str, token: &str) -> Self {
        let mut stored = ArrayString::new();
        for c in token.chars() {
            if stored.try_push(c).is_err() {
                break;
            }
        }
        Self { field, token: stored }
    }

    /// Name of the field that rejected the token.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The rejected token (truncated to 8 bytes).
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} token {:?}", self.field, self.token.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TokenError {}

/// A value type that can appear in a cell field.
pub trait FieldValue: Copy + FromStr<Err = TokenError> + fmt::Display {
    /// Token width in characters.
    const WIDTH: usize;
    /// Field name used in diagnostics.
    const NAME: &'static str;
}

/// A field that either inherits the previous value on its channel or sets
/// a new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Field<T> {
    /// Keep the last explicitly set value.
    #[default]
    Continue,
    /// Set a new value at this row.
    Set(T),
}

impl<T: Copy> Field<T> {
    /// The explicit value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Field::Continue => None,
            Field::Set(v) => Some(v),
        }
    }

    pub fn is_continue(self) -> bool {
        matches!(self, Field::Continue)
    }

    /// Resolve against the last known value.
    pub fn resolve(self, previous: T) -> T {
        self.value().unwrap_or(previous)
    }
}

impl<T: FieldValue> FromStr for Field<T> {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == continue_sentinel(T::WIDTH) {
            Ok(Field::Continue)
        } else {
            s.parse().map(Field::Set)
        }
    }
}

impl<T: FieldValue> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Continue => f.write_str(continue_sentinel(T::WIDTH)),
            Field::Set(v) => fmt::Display::fmt(v, f),
        }
    }
}

/// The note field: continue, silence the voice, or play a note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NoteField {
    #[default]
    Continue,
    /// Silence the voice from this row on.
    Off,
    On(Note),
}

impl NoteField {
    pub fn is_continue(self) -> bool {
        matches!(self, NoteField::Continue)
    }
}

impl From<Note> for NoteField {
    fn from(note: Note) -> Self {
        NoteField::On(note)
    }
}

impl FromStr for NoteField {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CONTINUE_3 => Ok(NoteField::Continue),
            OFF => Ok(NoteField::Off),
            _ => s.parse().map(NoteField::On),
        }
    }
}

impl fmt::Display for NoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteField::Continue => f.write_str(CONTINUE_3),
            NoteField::Off => f.write_str(OFF),
            NoteField::On(note) => fmt::Display::fmt(note, f),
        }
    }
}

/// Parse a two-digit decimal token (`"00"`-`"99"`).
pub(crate) fn parse_two_digits(s: &str) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some((bytes[0] - b'0') * 10 + (bytes[1] - b'0'))
}
