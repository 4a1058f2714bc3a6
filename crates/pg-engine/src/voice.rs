//! Sound sources: phase-accumulating oscillators and the noise reader.

use std::f32::consts::TAU;

use pg_ir::Waveform;

/// A phase accumulator running at a set frequency.
///
/// Phase runs over `[0, 1)`; shapes are derived from it per sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Oscillator {
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn set_frequency(&mut self, frequency: f32, sample_rate: u32) {
        self.increment = if sample_rate == 0 { 0.0 } else { frequency / sample_rate as f32 };
    }

    /// Return the current phase and advance by one sample.
    pub fn advance(&mut self) -> f32 {
        let phase = self.phase;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= libm::floorf(self.phase);
        }
        phase
    }
}

/// Rising sawtooth in `[-1, 1)` for a phase.
pub fn sawtooth(phase: f32) -> f32 {
    2.0 * phase - 1.0
}

/// One sample of a basic waveform at `phase`.
pub fn waveform_sample(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => libm::sinf(TAU * phase),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => sawtooth(phase),
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
    }
}

/// Reads a looped noise table at a variable rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseReader {
    position: f32,
    rate: f32,
}

impl Default for NoiseReader {
    fn default() -> Self {
        Self { position: 0.0, rate: 1.0 }
    }
}

impl NoiseReader {
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.0);
    }

    /// Restart the loop from its first sample.
    pub fn retrigger(&mut self) {
        self.position = 0.0;
    }

    /// Next sample from `table`. A stopped reader (rate 0) is silent.
    pub fn next(&mut self, table: &[f32]) -> f32 {
        if self.rate == 0.0 || table.is_empty() {
            return 0.0;
        }
        let len = table.len() as f32;
        let value = table[self.position as usize % table.len()];
        self.position += self.rate;
        if self.position >= len {
            self.position -= len * libm::floorf(self.position / len);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillator_wraps_phase() {
        let mut osc = Oscillator::default();
        osc.set_frequency(11025.0, 44100);
        let phases: Vec<f32> = (0..5).map(|_| osc.advance()).collect();
        assert_eq!(phases, [0.0, 0.25, 0.5, 0.75, 0.0]);
    }

    #[test]
    fn zero_frequency_holds_phase() {
        let mut osc = Oscillator::default();
        osc.set_frequency(0.0, 44100);
        osc.advance();
        assert_eq!(osc.advance(), 0.0);
    }

    #[test]
    fn waveform_shapes() {
        assert!(waveform_sample(Waveform::Sine, 0.0).abs() < 1e-6);
        assert!((waveform_sample(Waveform::Sine, 0.25) - 1.0).abs() < 1e-6);
        assert_eq!(waveform_sample(Waveform::Square, 0.2), 1.0);
        assert_eq!(waveform_sample(Waveform::Square, 0.7), -1.0);
        assert_eq!(waveform_sample(Waveform::Sawtooth, 0.0), -1.0);
        assert_eq!(waveform_sample(Waveform::Triangle, 0.5), 1.0);
        assert_eq!(waveform_sample(Waveform::Triangle, 0.0), -1.0);
    }

    #[test]
    fn noise_reader_rate_and_retrigger() {
        let table = [1.0, 2.0, 3.0, 4.0];
        let mut reader = NoiseReader::default();
        reader.set_rate(2.0);
        assert_eq!(reader.next(&table), 1.0);
        assert_eq!(reader.next(&table), 3.0);
        assert_eq!(reader.next(&table), 1.0);

        reader.set_rate(1.0);
        reader.next(&table);
        reader.retrigger();
        assert_eq!(reader.next(&table), 1.0);

        reader.set_rate(0.0);
        assert_eq!(reader.next(&table), 0.0);
    }
}
