//! The output seam between the tracker and a sound device.

use pg_engine::Frame;
use std::fmt;

/// Failure opening or driving an output.
#[derive(Debug)]
pub enum AudioError {
    /// The device refused to report a usable configuration.
    DeviceInit(String),
    StreamCreate(String),
    /// Starting or pausing the stream failed.
    Playback(String),
    NoDevice,
    /// Frames were written while the output was stopped; they would never
    /// drain.
    NotRunning,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "cannot configure output device: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "cannot open output stream: {}", msg),
            AudioError::Playback(msg) => write!(f, "stream control failed: {}", msg),
            AudioError::NoDevice => f.write_str("no output device"),
            AudioError::NotRunning => f.write_str("output is stopped"),
        }
    }
}

impl std::error::Error for AudioError {}

/// A sink for rendered frames that runs on its own clock.
///
/// `write` blocks until every frame is queued, so the output paces the
/// render loop that feeds it.
pub trait AudioOutput {
    /// Frames per second the output consumes.
    fn sample_rate(&self) -> u32;

    /// Queue `frames`, blocking while the output is full.
    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError>;

    /// Frames written but not yet played.
    fn queued_frames(&self) -> usize {
        0
    }

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
