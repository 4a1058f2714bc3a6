//! Engine configuration.

use std::time::Duration;

/// Lowest accepted tempo.
pub const MIN_BPM: f64 = 20.0;

/// Highest accepted tempo.
pub const MAX_BPM: f64 = 300.0;

/// Tempo of a freshly constructed engine.
pub const DEFAULT_BPM: f64 = 120.0;

/// Clamp a tempo into `[MIN_BPM, MAX_BPM]`. NaN falls back to the default.
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        DEFAULT_BPM
    } else {
        bpm.clamp(MIN_BPM, MAX_BPM)
    }
}

/// Construction-time settings for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Initial tempo.
    pub bpm: f64,
    /// How far ahead of the output clock rows are scheduled.
    pub lookahead: Duration,
    /// Period of the host's scheduler tick.
    pub tick_interval: Duration,
    /// Initial master gain (0.0-1.0).
    pub master_volume: f32,
    /// Frames rendered per block.
    pub block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bpm: DEFAULT_BPM,
            lookahead: Duration::from_millis(100),
            tick_interval: Duration::from_millis(25),
            master_volume: 0.8,
            block_size: 256,
        }
    }
}

impl EngineConfig {
    /// Override the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Override the initial tempo.
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpm_is_clamped() {
        assert_eq!(clamp_bpm(10.0), MIN_BPM);
        assert_eq!(clamp_bpm(1000.0), MAX_BPM);
        assert_eq!(clamp_bpm(140.0), 140.0);
        assert_eq!(clamp_bpm(f64::NAN), DEFAULT_BPM);
    }

    #[test]
    fn lookahead_exceeds_tick_interval() {
        let config = EngineConfig::default();
        assert!(config.lookahead > config.tick_interval);
    }
}
