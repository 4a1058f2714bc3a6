//! Engine error type.

use std::fmt;

use pg_ir::{FieldError, PatternId, ShapeMismatch};

use crate::scheduler::PlaybackState;

/// A playback transport request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Play,
    Pause,
    Resume,
    Stop,
}

/// Errors returned by engine operations.
///
/// None of these are fatal: the engine is left unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    /// The transport request is not valid in the current state.
    InvalidTransition { from: PlaybackState, request: Transport },
    /// The pattern table already holds `MAX_PATTERNS` patterns.
    PatternTableFull,
    /// No pattern with this id.
    UnknownPattern(PatternId),
    /// The current pattern cannot be deleted without naming a replacement.
    CurrentPatternDeletion(PatternId),
    /// The replacement for a deleted current pattern is invalid.
    InvalidReplacement(PatternId),
    /// The cell's shape does not fit the channel.
    CellKindMismatch(ShapeMismatch),
    /// A field-level edit was rejected.
    Field(FieldError),
    /// No pattern order entry at this index.
    OrderIndexOutOfRange(usize),
    /// The operation requires playback to be stopped.
    NotStopped(PlaybackState),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidTransition { from, request } => {
                write!(f, "cannot {:?} while {:?}", request, from)
            }
            EngineError::PatternTableFull => write!(f, "pattern table is full"),
            EngineError::UnknownPattern(id) => write!(f, "unknown pattern {:?}", id),
            EngineError::CurrentPatternDeletion(id) => {
                write!(f, "pattern {:?} is current and needs a replacement", id)
            }
            EngineError::InvalidReplacement(id) => {
                write!(f, "pattern {:?} cannot replace the current pattern", id)
            }
            EngineError::CellKindMismatch(err) => fmt::Display::fmt(err, f),
            EngineError::Field(err) => fmt::Display::fmt(err, f),
            EngineError::OrderIndexOutOfRange(index) => {
                write!(f, "no pattern order entry at {}", index)
            }
            EngineError::NotStopped(state) => {
                write!(f, "operation requires stopped playback (currently {:?})", state)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::CellKindMismatch(err) => Some(err),
            EngineError::Field(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShapeMismatch> for EngineError {
    fn from(err: ShapeMismatch) -> Self {
        EngineError::CellKindMismatch(err)
    }
}

impl From<FieldError> for EngineError {
    fn from(err: FieldError) -> Self {
        EngineError::Field(err)
    }
}
