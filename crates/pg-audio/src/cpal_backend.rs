//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use pg_engine::Frame;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{AudioError, AudioOutput};

/// How much audio the ring buffer holds, in milliseconds.
const BUFFER_MS: u32 = 100;

/// CPAL-based audio output.
///
/// Frames pass to the device callback through a lock-free SPSC ring
/// buffer. The stream is not `Send`; create and use the output on one
/// thread.
pub struct CpalOutput {
    config: StreamConfig,
    stream: Stream,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device and build a paused stream.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        if let Ok(name) = device.name() {
            log::info!("audio device: {}", name);
        }

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo output; the callback assumes 2-channel interleaving
        config.channels = 2;

        let capacity = (config.sample_rate.0 * BUFFER_MS / 1000) as usize;
        let (producer, consumer) = HeapRb::<Frame>::new(capacity).split();
        let running = Arc::new(AtomicBool::new(false));
        let stream = build_stream(&device, &config, consumer, running.clone())?;

        Ok(Self {
            config,
            stream,
            producer,
            running,
        })
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    mut consumer: HeapCons<Frame>,
    running: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }

                for chunk in data.chunks_mut(channels) {
                    let frame = consumer.try_pop().unwrap_or_default();
                    let left = frame.left as f32 / 32768.0;
                    let right = frame.right as f32 / 32768.0;
                    for (i, sample) in chunk.iter_mut().enumerate() {
                        *sample = match i {
                            0 => left,
                            1 => right,
                            _ => 0.0,
                        };
                    }
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let mut rest = frames;
        while !rest.is_empty() {
            if !self.running.load(Ordering::Relaxed) {
                return Err(AudioError::NotRunning);
            }
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if self.producer.is_full() {
                // Device drains a quarter of the buffer in this time.
                std::thread::sleep(Duration::from_millis(u64::from(BUFFER_MS / 4)));
            }
        }
        Ok(())
    }

    fn queued_frames(&self) -> usize {
        self.producer.occupied_len()
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }
}
