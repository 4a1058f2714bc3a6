//! Cell parameter values.

use core::fmt;
use core::str::FromStr;

use crate::field::{parse_two_digits, FieldValue, TokenError};

/// Volume level 0-15 (pulse and noise channels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(15);
    pub const SILENT: Volume = Volume(0);

    pub const fn new(level: u8) -> Option<Self> {
        if level <= 15 {
            Some(Volume(level))
        } else {
            None
        }
    }

    pub const fn level(self) -> u8 {
        self.0
    }
}

impl FieldValue for Volume {
    const WIDTH: usize = 2;
    const NAME: &'static str = "volume";
}

impl FromStr for Volume {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_two_digits(s)
            .and_then(Volume::new)
            .ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Pulse duty cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DutyCycle {
    /// 12.5%
    Eighth,
    /// 25%
    Quarter,
    /// 50%
    #[default]
    Half,
    /// 75%
    ThreeQuarters,
}

impl DutyCycle {
    pub const ALL: [DutyCycle; 4] = [
        DutyCycle::Eighth,
        DutyCycle::Quarter,
        DutyCycle::Half,
        DutyCycle::ThreeQuarters,
    ];

    /// Fraction of the period spent high.
    pub const fn ratio(self) -> f32 {
        match self {
            DutyCycle::Eighth => 0.125,
            DutyCycle::Quarter => 0.25,
            DutyCycle::Half => 0.5,
            DutyCycle::ThreeQuarters => 0.75,
        }
    }

    /// Index into per-duty tables.
    pub const fn index(self) -> usize {
        match self {
            DutyCycle::Eighth => 0,
            DutyCycle::Quarter => 1,
            DutyCycle::Half => 2,
            DutyCycle::ThreeQuarters => 3,
        }
    }

    const fn token(self) -> &'static str {
        match self {
            DutyCycle::Eighth => "12",
            DutyCycle::Quarter => "25",
            DutyCycle::Half => "50",
            DutyCycle::ThreeQuarters => "75",
        }
    }
}

impl FieldValue for DutyCycle {
    const WIDTH: usize = 2;
    const NAME: &'static str = "duty cycle";
}

impl FromStr for DutyCycle {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DutyCycle::ALL
            .into_iter()
            .find(|d| d.token() == s)
            .ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Direction of an envelope or sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'+' => Some(Direction::Up),
            b'-' => Some(Direction::Down),
            _ => None,
        }
    }

    const fn symbol(self) -> char {
        match self {
            Direction::Up => '+',
            Direction::Down => '-',
        }
    }
}

fn octal_digit(b: u8) -> Option<u8> {
    b.checked_sub(b'0').filter(|d| *d <= 7)
}

/// Volume envelope: direction and step period (0-7), e.g. `-3`.
///
/// Stored and edited, but it does not modulate the signal graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Envelope {
    pub direction: Direction,
    pub period: u8,
}

impl FieldValue for Envelope {
    const WIDTH: usize = 2;
    const NAME: &'static str = "envelope";
}

impl FromStr for Envelope {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.as_bytes() {
            [dir, period] => Direction::from_byte(*dir).and_then(|direction| {
                Some(Envelope {
                    direction,
                    period: octal_digit(*period)?,
                })
            }),
            _ => None,
        };
        parsed.ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.symbol(), self.period)
    }
}

/// Frequency sweep: period (0-7), direction and shift (0-7), e.g. `3-2`.
///
/// Stored and edited, but it does not modulate the signal graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sweep {
    pub period: u8,
    pub direction: Direction,
    pub shift: u8,
}

impl FieldValue for Sweep {
    const WIDTH: usize = 3;
    const NAME: &'static str = "sweep";
}

impl FromStr for Sweep {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.as_bytes() {
            [period, dir, shift] => octal_digit(*period).and_then(|period| {
                Some(Sweep {
                    period,
                    direction: Direction::from_byte(*dir)?,
                    shift: octal_digit(*shift)?,
                })
            }),
            _ => None,
        };
        parsed.ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.period, self.direction.symbol(), self.shift)
    }
}

/// Basic waveform of the wave channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    const fn token(self) -> &'static str {
        match self {
            Waveform::Sine => "SIN",
            Waveform::Square => "SQR",
            Waveform::Sawtooth => "SAW",
            Waveform::Triangle => "TRI",
        }
    }
}

impl FieldValue for Waveform {
    const WIDTH: usize = 3;
    const NAME: &'static str = "waveform";
}

impl FromStr for Waveform {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Waveform::ALL
            .into_iter()
            .find(|w| w.token() == s)
            .ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Coarse four-step volume of the wave channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WaveVolume {
    Off,
    Low,
    Mid,
    #[default]
    High,
}

impl WaveVolume {
    pub const ALL: [WaveVolume; 4] = [
        WaveVolume::Off,
        WaveVolume::Low,
        WaveVolume::Mid,
        WaveVolume::High,
    ];

    const fn token(self) -> &'static str {
        match self {
            WaveVolume::Off => "OF",
            WaveVolume::Low => "LO",
            WaveVolume::Mid => "MD",
            WaveVolume::High => "HI",
        }
    }
}

impl FieldValue for WaveVolume {
    const WIDTH: usize = 2;
    const NAME: &'static str = "wave volume";
}

impl FromStr for WaveVolume {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveVolume::ALL
            .into_iter()
            .find(|v| v.token() == s)
            .ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for WaveVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Noise playback rate, in tenths (0-99 → 0.0x-9.9x).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rate(u8);

impl Rate {
    /// 1.0x
    pub const UNITY: Rate = Rate(10);

    pub const fn new(tenths: u8) -> Option<Self> {
        if tenths <= 99 {
            Some(Rate(tenths))
        } else {
            None
        }
    }

    pub const fn tenths(self) -> u8 {
        self.0
    }

    /// Playback-rate multiplier.
    pub fn multiplier(self) -> f32 {
        self.0 as f32 / 10.0
    }
}

impl FieldValue for Rate {
    const WIDTH: usize = 2;
    const NAME: &'static str = "rate";
}

impl FromStr for Rate {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_two_digits(s)
            .and_then(Rate::new)
            .ok_or_else(|| TokenError::new(Self::NAME, s))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}
