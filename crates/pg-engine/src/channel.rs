//! Per-channel signal chain: source → (shaper) → gain → gate.

use pg_ir::{ChannelKind, DutyCycle, Waveform};

use crate::resolve::Resolved;
use crate::timeline::Timeline;
use crate::voice::{sawtooth, waveform_sample, NoiseReader, Oscillator};
use crate::waveshape::{duty_curve, noise_table, shape, Curve};

/// A parameter change on a channel's automation timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Automation {
    /// Program the whole chain from a resolved row.
    Row(Resolved),
    /// Set the channel gain alone.
    Gain(f32),
}

/// The chain's sound source.
#[derive(Clone, Copy, Debug)]
enum Source {
    /// Sawtooth through a duty-cycle transfer curve.
    Pulse { osc: Oscillator, curve: &'static Curve },
    Wave { osc: Oscillator, waveform: Waveform },
    Noise { reader: NoiseReader, table: &'static [f32] },
}

/// One channel's persistent node chain and its automation.
#[derive(Clone, Debug)]
pub struct ChannelStrip {
    kind: ChannelKind,
    source: Source,
    gain: f32,
    /// Enable gate, 0.0 or 1.0.
    gate: f32,
    automation: Timeline<Automation>,
    gates: Timeline<bool>,
}

impl ChannelStrip {
    /// Build the chain for `kind`, silent and enabled.
    pub fn new(kind: ChannelKind) -> Self {
        let source = match kind {
            ChannelKind::Pulse1 | ChannelKind::Pulse2 => Source::Pulse {
                osc: Oscillator::default(),
                curve: duty_curve(DutyCycle::default()),
            },
            ChannelKind::Wave => Source::Wave {
                osc: Oscillator::default(),
                waveform: Waveform::default(),
            },
            ChannelKind::Noise => Source::Noise {
                reader: NoiseReader::default(),
                table: noise_table(),
            },
        };
        Self {
            kind,
            source,
            gain: 0.0,
            gate: 1.0,
            automation: Timeline::new(),
            gates: Timeline::new(),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_open(&self) -> bool {
        self.gate > 0.0
    }

    pub fn schedule(&mut self, frame: u64, automation: Automation) {
        self.automation.push(frame, automation);
    }

    pub fn schedule_gate(&mut self, frame: u64, enabled: bool) {
        self.gates.push(frame, enabled);
    }

    /// Drop automation at or after `frame`. Gate changes are kept.
    pub fn cancel_from(&mut self, frame: u64) {
        self.automation.cancel_from(frame);
    }

    /// Number of automation entries not yet applied.
    pub fn pending(&self) -> usize {
        self.automation.pending()
    }

    /// Render one sample at `frame`, applying any automation due.
    pub fn next_sample(&mut self, frame: u64, sample_rate: u32) -> f32 {
        while let Some(automation) = self.automation.pop_due(frame) {
            self.apply(automation, sample_rate);
        }
        while let Some(enabled) = self.gates.pop_due(frame) {
            self.gate = if enabled { 1.0 } else { 0.0 };
        }

        let raw = match &mut self.source {
            Source::Pulse { osc, curve } => shape(curve, sawtooth(osc.advance())),
            Source::Wave { osc, waveform } => waveform_sample(*waveform, osc.advance()),
            Source::Noise { reader, table } => reader.next(table),
        };
        raw * self.gain * self.gate
    }

    fn apply(&mut self, automation: Automation, sample_rate: u32) {
        match (automation, &mut self.source) {
            (Automation::Gain(gain), _) => self.gain = gain,
            (
                Automation::Row(Resolved::Pulse { frequency, duty, gain }),
                Source::Pulse { osc, curve },
            ) => {
                osc.set_frequency(frequency, sample_rate);
                *curve = duty_curve(duty);
                self.gain = gain;
            }
            (
                Automation::Row(Resolved::Wave { frequency, waveform: w, gain }),
                Source::Wave { osc, waveform },
            ) => {
                osc.set_frequency(frequency, sample_rate);
                *waveform = w;
                self.gain = gain;
            }
            (
                Automation::Row(Resolved::Noise { rate, retrigger, gain }),
                Source::Noise { reader, .. },
            ) => {
                reader.set_rate(rate);
                if retrigger {
                    reader.retrigger();
                }
                self.gain = gain;
            }
            (Automation::Row(resolved), _) => {
                debug_assert!(false, "{:?} scheduled on {} channel", resolved, self.kind);
            }
        }
    }
}
