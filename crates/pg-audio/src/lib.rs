//! Audio output backends for the pulsegrid tracker.

mod cpal_backend;
mod null;
mod traits;

pub use cpal_backend::CpalOutput;
pub use null::NullOutput;
pub use traits::{AudioError, AudioOutput};
