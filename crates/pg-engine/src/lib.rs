//! Playback engine for the pulsegrid tracker.
//!
//! Resolves pattern rows into per-channel control values, schedules them
//! ahead of the output clock onto a fixed signal graph and renders frames.

mod bus;
mod channel;
mod config;
mod engine;
mod error;
mod frame;
mod graph;
mod resolve;
pub mod scheduler;
mod timeline;
pub mod tuning;
mod voice;
pub mod waveshape;

pub use bus::{EngineEvent, EventBus, Handler, HandlerError, Subscription, Topic};
pub use channel::{Automation, ChannelStrip};
pub use config::{clamp_bpm, EngineConfig, DEFAULT_BPM, MAX_BPM, MIN_BPM};
pub use engine::Engine;
pub use error::{EngineError, Transport};
pub use frame::Frame;
pub use graph::SignalGraph;
pub use resolve::{NoiseState, PulseState, Resolved, ResolverState, WaveState};
pub use scheduler::{row_duration, Cursor, PlayMode, PlayOptions, PlaybackState, Position};
pub use timeline::{Timed, Timeline};
