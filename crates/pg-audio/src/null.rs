//! Output that discards frames in real time.

use std::time::{Duration, Instant};

use pg_engine::Frame;

use crate::traits::{AudioError, AudioOutput};

/// Discards frames, sleeping so that writes advance at the sample rate.
///
/// Stands in for a device on headless hosts and in tests.
#[derive(Debug)]
pub struct NullOutput {
    sample_rate: u32,
    /// Wall-clock time the output started, and frames written since.
    started: Option<(Instant, u64)>,
    /// Skip sleeping entirely.
    unpaced: bool,
}

impl NullOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, started: None, unpaced: false }
    }

    /// An output that accepts frames as fast as they are written.
    pub fn unpaced(sample_rate: u32) -> Self {
        Self { unpaced: true, ..Self::new(sample_rate) }
    }

    /// Frames written since `start`.
    pub fn frames_written(&self) -> u64 {
        self.started.map_or(0, |(_, frames)| frames)
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let Some((epoch, written)) = self.started.as_mut() else {
            return Err(AudioError::NotRunning);
        };
        *written += frames.len() as u64;
        if !self.unpaced && self.sample_rate > 0 {
            let due = Duration::from_secs_f64(*written as f64 / self.sample_rate as f64);
            if let Some(wait) = due.checked_sub(epoch.elapsed()) {
                std::thread::sleep(wait);
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.started = Some((Instant::now(), 0));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.started = None;
        Ok(())
    }
}
