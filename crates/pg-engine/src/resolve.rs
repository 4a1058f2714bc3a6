//! Row resolution: typed cells plus last-known values → control values.
//!
//! A `Continue` field keeps the value last set on the channel. Note `Off`
//! silences the voice until the next note but leaves every other field as
//! resolved. The state is part of the playback cursor and is reset at the
//! start of every playback.

use pg_ir::{
    Cell, ChannelKind, DutyCycle, Envelope, NoiseCell, Note, NoteField, Pattern, PulseCell, Rate,
    Sweep, Volume, WaveCell, WaveVolume, Waveform, NUM_CHANNELS,
};

use crate::tuning::{note_frequency, volume_gain, wave_volume_gain};

/// Control values for one channel at one row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolved {
    Pulse { frequency: f32, duty: DutyCycle, gain: f32 },
    Wave { frequency: f32, waveform: Waveform, gain: f32 },
    /// `retrigger` restarts the noise loop.
    Noise { rate: f32, retrigger: bool, gain: f32 },
}

impl Resolved {
    pub fn gain(&self) -> f32 {
        match self {
            Resolved::Pulse { gain, .. }
            | Resolved::Wave { gain, .. }
            | Resolved::Noise { gain, .. } => *gain,
        }
    }

    /// Pitch in Hz; `None` for the noise channel.
    pub fn frequency(&self) -> Option<f32> {
        match self {
            Resolved::Pulse { frequency, .. } | Resolved::Wave { frequency, .. } => {
                Some(*frequency)
            }
            Resolved::Noise { .. } => None,
        }
    }
}

/// Last note on a melodic channel and whether it still sounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Pitch {
    note: Option<Note>,
    sounding: bool,
}

impl Pitch {
    fn update(&mut self, field: NoteField) {
        match field {
            NoteField::Continue => {}
            NoteField::Off => self.sounding = false,
            NoteField::On(note) => {
                self.note = Some(note);
                self.sounding = true;
            }
        }
    }

    fn frequency(&self) -> f32 {
        self.note.map_or(0.0, note_frequency)
    }
}

/// Last-known values of a pulse channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseState {
    pitch: Pitch,
    pub volume: Volume,
    pub duty: DutyCycle,
    /// Carried for display; it does not reach the signal graph.
    pub envelope: Option<Envelope>,
    /// Carried for display; it does not reach the signal graph.
    pub sweep: Option<Sweep>,
}

impl Default for PulseState {
    fn default() -> Self {
        Self {
            pitch: Pitch::default(),
            volume: Volume::MAX,
            duty: DutyCycle::default(),
            envelope: None,
            sweep: None,
        }
    }
}

impl PulseState {
    pub fn note(&self) -> Option<Note> {
        self.pitch.note
    }

    pub fn is_sounding(&self) -> bool {
        self.pitch.sounding
    }

    fn resolve(&mut self, cell: &PulseCell) -> Resolved {
        self.pitch.update(cell.note);
        self.volume = cell.volume.resolve(self.volume);
        self.duty = cell.duty_cycle.resolve(self.duty);
        self.envelope = cell.envelope.value().or(self.envelope);
        self.sweep = cell.sweep.value().or(self.sweep);

        let gain = if self.pitch.sounding { volume_gain(self.volume) } else { 0.0 };
        Resolved::Pulse { frequency: self.pitch.frequency(), duty: self.duty, gain }
    }
}

/// Last-known values of the wave channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveState {
    pitch: Pitch,
    pub volume: WaveVolume,
    pub waveform: Waveform,
}

impl WaveState {
    pub fn note(&self) -> Option<Note> {
        self.pitch.note
    }

    pub fn is_sounding(&self) -> bool {
        self.pitch.sounding
    }

    fn resolve(&mut self, cell: &WaveCell) -> Resolved {
        self.pitch.update(cell.note);
        self.volume = cell.volume.resolve(self.volume);
        self.waveform = cell.waveform.resolve(self.waveform);

        let gain = if self.pitch.sounding { wave_volume_gain(self.volume) } else { 0.0 };
        Resolved::Wave { frequency: self.pitch.frequency(), waveform: self.waveform, gain }
    }
}

/// Last-known values of the noise channel.
///
/// The channel has no note; it sounds once a rate or volume has been set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoiseState {
    pub active: bool,
    pub rate: Rate,
    pub volume: Volume,
    /// Carried for display; it does not reach the signal graph.
    pub envelope: Option<Envelope>,
}

impl Default for NoiseState {
    fn default() -> Self {
        Self {
            active: false,
            rate: Rate::UNITY,
            volume: Volume::MAX,
            envelope: None,
        }
    }
}

impl NoiseState {
    fn resolve(&mut self, cell: &NoiseCell) -> Resolved {
        let explicit_rate = cell.rate.value();
        self.active |= explicit_rate.is_some() || cell.volume.value().is_some();
        self.rate = explicit_rate.unwrap_or(self.rate);
        self.volume = cell.volume.resolve(self.volume);
        self.envelope = cell.envelope.value().or(self.envelope);

        let gain = if self.active { volume_gain(self.volume) } else { 0.0 };
        Resolved::Noise {
            rate: self.rate.multiplier(),
            retrigger: explicit_rate.is_some(),
            gain,
        }
    }
}

/// Last-known values of every channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverState {
    pulse: [PulseState; 2],
    wave: WaveState,
    noise: NoiseState,
}

impl ResolverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one pulse channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is not a pulse channel.
    pub fn pulse(&self, channel: ChannelKind) -> &PulseState {
        assert!(channel.is_pulse(), "{} is not a pulse channel", channel);
        &self.pulse[channel.index()]
    }

    pub fn wave(&self) -> &WaveState {
        &self.wave
    }

    pub fn noise(&self) -> &NoiseState {
        &self.noise
    }

    /// Fold one cell into the channel's state and return its control values.
    pub fn resolve(&mut self, channel: ChannelKind, cell: &Cell) -> Resolved {
        match (channel, cell) {
            (ChannelKind::Pulse1 | ChannelKind::Pulse2, Cell::Pulse(c)) => {
                self.pulse[channel.index()].resolve(c)
            }
            (ChannelKind::Wave, Cell::Wave(c)) => self.wave.resolve(c),
            (ChannelKind::Noise, Cell::Noise(c)) => self.noise.resolve(c),
            _ => {
                log::warn!("{} channel cannot resolve {:?}, continuing", channel, cell);
                self.resolve(channel, &Cell::empty(channel))
            }
        }
    }

    /// Resolve every channel of `row` in column order.
    pub fn resolve_row(&mut self, pattern: &Pattern, row: usize) -> [Resolved; NUM_CHANNELS] {
        ChannelKind::ALL.map(|channel| self.resolve(channel, &pattern.cell(channel, row)))
    }
}
