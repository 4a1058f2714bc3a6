//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: i16) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Convert a mixed sample in `[-1, 1]` to a mono frame, clipping.
    pub fn from_sample(sample: f32) -> Self {
        Self::mono((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_sample_clips() {
        assert_eq!(Frame::from_sample(2.0), Frame::mono(i16::MAX));
        assert_eq!(Frame::from_sample(-2.0), Frame::mono(-i16::MAX));
        assert!(Frame::from_sample(0.0).is_silent());
    }
}
