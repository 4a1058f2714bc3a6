//! Host controller for the pulsegrid tracker.
//!
//! Owns an [`Engine`] behind a lock and drives it from two threads: a
//! scheduler thread that ticks row scheduling ahead of the output clock,
//! and an audio thread that renders blocks into an [`AudioOutput`]. Editor
//! and transport calls take the same lock, so they never observe a
//! half-scheduled row.

use pg_audio::{AudioError, AudioOutput, CpalOutput, NullOutput};
use pg_engine::{EngineConfig, EngineError, HandlerError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

// Re-export common types so callers don't need pg-engine/pg-ir directly.
pub use pg_engine::{
    Engine, EngineEvent, Frame, PlayMode, PlayOptions, PlaybackState, Position, Subscription, Topic,
};
pub use pg_ir::{Cell, CellField, ChannelKind, PatternId, PatternMeta};

/// Where rendered audio goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// The default cpal output device.
    #[default]
    Device,
    /// Discard frames, paced in real time.
    Null,
}

/// Errors from the controller.
#[derive(Debug)]
pub enum ControllerError {
    Engine(EngineError),
    Audio(AudioError),
    /// A worker thread could not be started or died during startup.
    Thread(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Engine(err) => write!(f, "engine: {}", err),
            ControllerError::Audio(err) => write!(f, "audio: {}", err),
            ControllerError::Thread(msg) => write!(f, "thread: {}", msg),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControllerError::Engine(err) => Some(err),
            ControllerError::Audio(err) => Some(err),
            ControllerError::Thread(_) => None,
        }
    }
}

impl From<EngineError> for ControllerError {
    fn from(err: EngineError) -> Self {
        ControllerError::Engine(err)
    }
}

impl From<AudioError> for ControllerError {
    fn from(err: AudioError) -> Self {
        ControllerError::Audio(err)
    }
}

fn lock(engine: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running tracker: engine plus its scheduler and audio threads.
///
/// Event handlers run on whichever thread triggered the event, with the
/// engine lock held; they must not call back into the controller.
pub struct Controller {
    engine: Arc<Mutex<Engine>>,
    running: Arc<AtomicBool>,
    scheduler: Option<JoinHandle<()>>,
    audio: Option<JoinHandle<()>>,
}

impl Controller {
    /// Build an engine and start its threads on `backend`.
    ///
    /// With [`Backend::Device`] the engine adopts the device's sample rate.
    pub fn new(config: EngineConfig, backend: Backend) -> Result<Self, ControllerError> {
        let tick_interval = config.tick_interval;
        let block_size = config.block_size.max(1);
        let sample_rate = config.sample_rate;
        let engine = Arc::new(Mutex::new(Engine::new(config)));
        let running = Arc::new(AtomicBool::new(true));

        let (ready_tx, ready_rx) = mpsc::channel();
        let audio = {
            let engine = engine.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("pg-audio".into())
                .spawn(move || {
                    let output: Result<Box<dyn AudioOutput>, AudioError> = match backend {
                        Backend::Device => {
                            CpalOutput::new().map(|o| Box::new(o) as Box<dyn AudioOutput>)
                        }
                        Backend::Null => Ok(Box::new(NullOutput::new(sample_rate))),
                    };
                    match output {
                        Ok(output) => audio_thread(output, engine, running, block_size, ready_tx),
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                        }
                    }
                })
                .map_err(|e| ControllerError::Thread(e.to_string()))?
        };

        match ready_rx.recv() {
            Ok(Ok(rate)) => log::info!("audio running at {} Hz", rate),
            Ok(Err(err)) => {
                let _ = audio.join();
                return Err(err.into());
            }
            Err(_) => {
                let _ = audio.join();
                return Err(ControllerError::Thread("audio thread exited during startup".into()));
            }
        }

        let scheduler = {
            let engine = engine.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("pg-scheduler".into())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        lock(&engine).tick();
                        std::thread::sleep(tick_interval);
                    }
                })
        };
        let scheduler = match scheduler {
            Ok(handle) => handle,
            Err(e) => {
                running.store(false, Ordering::Relaxed);
                let _ = audio.join();
                return Err(ControllerError::Thread(e.to_string()));
            }
        };

        Ok(Self {
            engine,
            running,
            scheduler: Some(scheduler),
            audio: Some(audio),
        })
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut lock(&self.engine))
    }

    /// Subscribe to an engine topic.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&EngineEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        lock(&self.engine).subscribe(topic, handler)
    }

    // --- Editing (current pattern) ---

    pub fn cell_data(&self, row: usize, channel: ChannelKind) -> Cell {
        lock(&self.engine).cell_data(row, channel)
    }

    pub fn set_cell_data(
        &self,
        row: usize,
        channel: ChannelKind,
        cell: Cell,
    ) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).set_cell_data(row, channel, cell)?)
    }

    pub fn set_cell_field(
        &self,
        row: usize,
        channel: ChannelKind,
        field: CellField,
        token: &str,
    ) -> Result<(), ControllerError> {
        let mut engine = lock(&self.engine);
        let pattern = engine.current_pattern();
        Ok(engine.set_cell_field(pattern, channel, row, field, token)?)
    }

    pub fn patterns_metadata(&self) -> Vec<PatternMeta> {
        lock(&self.engine).patterns_metadata()
    }

    pub fn add_pattern(&self, name: Option<&str>) -> Result<PatternId, ControllerError> {
        Ok(lock(&self.engine).create_pattern(name)?)
    }

    pub fn delete_pattern(&self, id: PatternId) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).delete_pattern(id)?)
    }

    pub fn current_pattern(&self) -> PatternId {
        lock(&self.engine).current_pattern()
    }

    pub fn set_current_pattern(&self, id: PatternId) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).set_current_pattern(id)?)
    }

    // --- Transport ---

    pub fn play(&self, options: PlayOptions) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).play(options)?)
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).pause()?)
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).resume()?)
    }

    pub fn stop(&self) -> Result<(), ControllerError> {
        Ok(lock(&self.engine).stop()?)
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.engine).state()
    }

    pub fn position(&self) -> Option<Position> {
        lock(&self.engine).position()
    }

    // --- Global parameters ---

    pub fn set_bpm(&self, bpm: f64) -> f64 {
        lock(&self.engine).set_bpm(bpm)
    }

    pub fn set_looping(&self, looping: bool) {
        lock(&self.engine).set_looping(looping)
    }

    pub fn set_master_volume(&self, volume: f32) {
        lock(&self.engine).set_master_volume(volume)
    }

    pub fn toggle_channel(&self, channel: ChannelKind) -> bool {
        lock(&self.engine).toggle_channel(channel)
    }

    /// Stop playback, join the worker threads and silence the engine.
    /// Called by `Drop`; calling it twice is harmless.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }
        lock(&self.engine).shutdown();
        for handle in [self.scheduler.take(), self.audio.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
        log::debug!("controller shut down");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render blocks into `output` until `running` clears.
///
/// Reports the output's sample rate (or the startup error) on `ready`
/// before entering the loop.
fn audio_thread(
    mut output: Box<dyn AudioOutput>,
    engine: Arc<Mutex<Engine>>,
    running: Arc<AtomicBool>,
    block_size: usize,
    ready: mpsc::Sender<Result<u32, AudioError>>,
) {
    let rate = output.sample_rate();
    let started = lock(&engine)
        .set_sample_rate(rate)
        .map_err(|e| AudioError::DeviceInit(e.to_string()))
        .and_then(|()| output.start());
    if let Err(err) = started {
        let _ = ready.send(Err(err));
        return;
    }
    let _ = ready.send(Ok(rate));

    let mut block = vec![Frame::silence(); block_size];
    while running.load(Ordering::Relaxed) {
        let queued = output.queued_frames() + block.len();
        {
            let mut engine = lock(&engine);
            engine.set_output_latency(queued as u64);
            engine.render(&mut block);
        }
        if let Err(err) = output.write(&block) {
            log::error!("audio write failed: {}", err);
            break;
        }
    }

    if let Err(err) = output.stop() {
        log::warn!("stopping audio output: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn headless() -> Controller {
        Controller::new(EngineConfig::default(), Backend::Null).unwrap()
    }

    #[test]
    fn rows_advance_in_real_time() {
        let ctrl = headless();
        ctrl.set_bpm(300.0);
        let rows = Arc::new(Mutex::new(Vec::new()));
        let seen = rows.clone();
        let _sub = ctrl.subscribe(Topic::PlayedRow, move |e| {
            if let EngineEvent::PlayedRow { row, .. } = e {
                seen.lock().unwrap().push(*row);
            }
            Ok(())
        });

        ctrl.play(PlayOptions::new().rows(0, 3).looping(true)).unwrap();
        std::thread::sleep(Duration::from_millis(400));
        ctrl.stop().unwrap();

        let rows = rows.lock().unwrap();
        assert!(rows.len() >= 4, "rows: {:?}", rows);
        assert_eq!(rows[..4], [0, 1, 2, 3]);
    }

    #[test]
    fn editing_goes_through_current_pattern() {
        let ctrl = headless();
        let added = ctrl.add_pattern(Some("B")).unwrap();
        assert_eq!(ctrl.current_pattern(), added);
        ctrl.set_cell_field(5, ChannelKind::Wave, CellField::Waveform, "SQR").unwrap();
        assert!(!ctrl.cell_data(5, ChannelKind::Wave).is_empty());
        assert_eq!(ctrl.patterns_metadata().len(), 2);
    }

    #[test]
    fn shutdown_stops_playback_and_is_idempotent() {
        let mut ctrl = headless();
        ctrl.play(PlayOptions::new()).unwrap();
        ctrl.shutdown();
        assert_eq!(ctrl.state(), PlaybackState::Stopped);
        ctrl.shutdown();
    }

    #[test]
    fn transport_errors_surface_as_engine_errors() {
        let ctrl = headless();
        assert!(matches!(
            ctrl.pause(),
            Err(ControllerError::Engine(EngineError::InvalidTransition { .. }))
        ));
    }
}
