//! Channel kinds.

use core::fmt;

/// Number of voices in every pattern.
pub const NUM_CHANNELS: usize = 4;

/// One of the four fixed voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Pulse1,
    Pulse2,
    Wave,
    Noise,
}

impl ChannelKind {
    /// All channels in column order.
    pub const ALL: [ChannelKind; NUM_CHANNELS] = [
        ChannelKind::Pulse1,
        ChannelKind::Pulse2,
        ChannelKind::Wave,
        ChannelKind::Noise,
    ];

    /// Column index (0-3).
    pub const fn index(self) -> usize {
        match self {
            ChannelKind::Pulse1 => 0,
            ChannelKind::Pulse2 => 1,
            ChannelKind::Wave => 2,
            ChannelKind::Noise => 3,
        }
    }

    /// Channel for a column index, if in range.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ChannelKind::Pulse1),
            1 => Some(ChannelKind::Pulse2),
            2 => Some(ChannelKind::Wave),
            3 => Some(ChannelKind::Noise),
            _ => None,
        }
    }

    /// True for the two pulse voices.
    pub const fn is_pulse(self) -> bool {
        matches!(self, ChannelKind::Pulse1 | ChannelKind::Pulse2)
    }

    /// Short display label.
    pub const fn label(self) -> &'static str {
        match self {
            ChannelKind::Pulse1 => "Pulse 1",
            ChannelKind::Pulse2 => "Pulse 2",
            ChannelKind::Wave => "Wave",
            ChannelKind::Noise => "Noise",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
