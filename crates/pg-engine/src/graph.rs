//! The fixed signal graph: four channel strips into one master gain.

use pg_ir::{ChannelKind, NUM_CHANNELS};

use crate::channel::{Automation, ChannelStrip};
use crate::frame::Frame;
use crate::resolve::Resolved;
use crate::timeline::Timeline;

/// Headroom applied to the summed channels before the master gain.
const MIX_SCALE: f32 = 1.0 / NUM_CHANNELS as f32;

/// Channel strips, master bus and the output clock.
///
/// The clock is the count of rendered frames. It does not advance while
/// the graph is held.
#[derive(Clone, Debug)]
pub struct SignalGraph {
    channels: [ChannelStrip; NUM_CHANNELS],
    /// Latest requested gate state per channel.
    enabled: [bool; NUM_CHANNELS],
    master: f32,
    master_automation: Timeline<f32>,
    frame: u64,
    sample_rate: u32,
    held: bool,
}

impl SignalGraph {
    pub fn new(sample_rate: u32, master_volume: f32) -> Self {
        Self {
            channels: ChannelKind::ALL.map(ChannelStrip::new),
            enabled: [true; NUM_CHANNELS],
            master: master_volume,
            master_automation: Timeline::new(),
            frame: 0,
            sample_rate,
            held: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Output clock in seconds.
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// First frame at or after `time` seconds.
    pub fn frame_at(&self, time: f64) -> u64 {
        libm::ceil(time * self.sample_rate as f64).max(0.0) as u64
    }

    pub fn channel(&self, channel: ChannelKind) -> &ChannelStrip {
        &self.channels[channel.index()]
    }

    /// Program `channel` with a resolved row at `frame`.
    pub fn schedule_row(&mut self, channel: ChannelKind, resolved: Resolved, frame: u64) {
        self.channels[channel.index()].schedule(frame, Automation::Row(resolved));
    }

    /// Open or close a channel's gate from the current frame on.
    pub fn set_channel_enabled(&mut self, channel: ChannelKind, enabled: bool) {
        self.enabled[channel.index()] = enabled;
        self.channels[channel.index()].schedule_gate(self.frame, enabled);
    }

    pub fn channel_enabled(&self, channel: ChannelKind) -> bool {
        self.enabled[channel.index()]
    }

    /// Set the master gain from the current frame on.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_automation.push(self.frame, volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.master
    }

    /// Drop channel automation at or after `frame`.
    pub fn cancel_from(&mut self, frame: u64) {
        for strip in &mut self.channels {
            strip.cancel_from(frame);
        }
    }

    /// Cut every channel's gain at `frame`.
    pub fn silence(&mut self, frame: u64) {
        for strip in &mut self.channels {
            strip.schedule(frame, Automation::Gain(0.0));
        }
    }

    /// Total channel automation entries not yet applied.
    pub fn pending(&self) -> usize {
        self.channels.iter().map(ChannelStrip::pending).sum()
    }

    /// Freeze or release the clock. A held graph renders silence and keeps
    /// oscillator phase and gains as they are.
    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    /// Rebuild for a new sample rate; automation is discarded and the clock
    /// restarts at zero. Gate and master settings are kept.
    pub fn reset(&mut self, sample_rate: u32) {
        while let Some(volume) = self.master_automation.pop_due(u64::MAX) {
            self.master = volume;
        }
        let enabled = self.enabled;
        *self = Self::new(sample_rate, self.master);
        for channel in ChannelKind::ALL {
            self.set_channel_enabled(channel, enabled[channel.index()]);
        }
    }

    /// Fill `out` with the next frames.
    pub fn render(&mut self, out: &mut [Frame]) {
        if self.held {
            out.fill(Frame::silence());
            return;
        }
        for slot in out.iter_mut() {
            while let Some(volume) = self.master_automation.pop_due(self.frame) {
                self.master = volume;
            }
            let mut mix = 0.0;
            for strip in &mut self.channels {
                mix += strip.next_sample(self.frame, self.sample_rate);
            }
            *slot = Frame::from_sample(mix * MIX_SCALE * self.master);
            self.frame += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_ir::{DutyCycle, Waveform};

    const SR: u32 = 44100;

    fn square(gain: f32) -> Resolved {
        Resolved::Wave { frequency: 441.0, waveform: Waveform::Square, gain }
    }

    fn render(graph: &mut SignalGraph, frames: usize) -> Vec<Frame> {
        let mut out = vec![Frame::mono(1); frames];
        graph.render(&mut out);
        out
    }

    #[test]
    fn clock_counts_rendered_frames() {
        let mut graph = SignalGraph::new(SR, 1.0);
        render(&mut graph, 441);
        assert_eq!(graph.frame(), 441);
        assert!((graph.now() - 0.01).abs() < 1e-12);
        assert_eq!(graph.frame_at(0.01), 441);
        assert_eq!(graph.frame_at(0.010_000_1), 442);
    }

    #[test]
    fn mixes_scaled_by_master() {
        let mut graph = SignalGraph::new(SR, 0.5);
        graph.schedule_row(ChannelKind::Wave, square(1.0), 0);
        let out = render(&mut graph, 1);
        assert_eq!(out[0], Frame::from_sample(0.25 * 0.5));
    }

    #[test]
    fn held_graph_is_silent_and_frozen() {
        let mut graph = SignalGraph::new(SR, 1.0);
        graph.schedule_row(ChannelKind::Wave, square(1.0), 0);
        graph.set_held(true);
        let out = render(&mut graph, 32);
        assert!(out.iter().all(Frame::is_silent));
        assert_eq!(graph.frame(), 0);
        assert_eq!(graph.pending(), 1);

        graph.set_held(false);
        assert!(!render(&mut graph, 1)[0].is_silent());
    }

    #[test]
    fn cancel_then_silence_cuts_future_rows() {
        let mut graph = SignalGraph::new(SR, 1.0);
        graph.schedule_row(ChannelKind::Wave, square(1.0), 0);
        graph.schedule_row(
            ChannelKind::Pulse1,
            Resolved::Pulse { frequency: 441.0, duty: DutyCycle::Half, gain: 1.0 },
            100,
        );
        render(&mut graph, 10);

        graph.cancel_from(graph.frame());
        graph.silence(graph.frame());
        let out = render(&mut graph, 200);
        assert!(out.iter().all(Frame::is_silent));
        assert_eq!(graph.pending(), 0);
    }

    #[test]
    fn disabled_channel_is_gated() {
        let mut graph = SignalGraph::new(SR, 1.0);
        graph.schedule_row(ChannelKind::Wave, square(1.0), 0);
        graph.set_channel_enabled(ChannelKind::Wave, false);
        assert!(!graph.channel_enabled(ChannelKind::Wave));
        assert!(render(&mut graph, 16).iter().all(Frame::is_silent));
        assert_eq!(graph.channel(ChannelKind::Wave).gain(), 1.0);
    }

    #[test]
    fn master_volume_applies_at_current_frame() {
        let mut graph = SignalGraph::new(SR, 1.0);
        graph.set_master_volume(0.0);
        assert_eq!(graph.master_volume(), 1.0);
        render(&mut graph, 1);
        assert_eq!(graph.master_volume(), 0.0);
    }

    #[test]
    fn reset_keeps_gates_and_master() {
        let mut graph = SignalGraph::new(SR, 1.0);
        graph.set_channel_enabled(ChannelKind::Noise, false);
        graph.set_master_volume(0.3);
        render(&mut graph, 5);
        graph.reset(48000);

        assert_eq!(graph.frame(), 0);
        assert_eq!(graph.sample_rate(), 48000);
        assert_eq!(graph.master_volume(), 0.3);
        assert!(!graph.channel_enabled(ChannelKind::Noise));
    }
}
