//! The tracker engine: pattern table, transport and signal graph.

use std::collections::VecDeque;

use pg_ir::{
    Cell, CellField, ChannelKind, Pattern, PatternId, PatternMeta, PatternTable, Token,
};

use crate::bus::{EngineEvent, EventBus, HandlerError, Subscription, Topic};
use crate::config::{clamp_bpm, EngineConfig};
use crate::error::{EngineError, Transport};
use crate::frame::Frame;
use crate::graph::SignalGraph;
use crate::resolve::ResolverState;
use crate::scheduler::{
    row_duration, Cursor, PendingRow, PlayMode, PlayOptions, PlaybackState, Position, LAST_ROW,
};

/// Owns the song and renders it.
///
/// Editing and transport calls are plain method calls; the host drives
/// time by calling [`tick`](Self::tick) periodically and
/// [`render`](Self::render) from its audio path.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    patterns: PatternTable,
    current: PatternId,
    bpm: f64,
    looping: bool,
    master_volume: f32,
    graph: SignalGraph,
    bus: EventBus,

    // --- Transport ---
    state: PlaybackState,
    /// Next row to schedule.
    cursor: Option<Cursor>,
    /// Last-known field values, advanced as rows are scheduled.
    resolver: ResolverState,
    /// Clock time of the next row to schedule.
    next_row_time: f64,
    /// Rows scheduled but not yet reached by the clock.
    pending: VecDeque<PendingRow>,
    /// Clock time at which playback runs out.
    end_time: Option<f64>,
    /// Last row reached by the clock.
    position: Option<Position>,
    /// Frames rendered but not yet heard, queued in the host's output.
    output_latency: u64,
}

impl Engine {
    /// Create an engine holding one empty pattern, which is current.
    pub fn new(config: EngineConfig) -> Self {
        let mut patterns = PatternTable::new();
        // An empty table always has room.
        let current = patterns.insert(None).unwrap_or_default();
        let bpm = clamp_bpm(config.bpm);
        let master_volume = config.master_volume.clamp(0.0, 1.0);
        log::debug!("engine created at {} Hz, {} bpm", config.sample_rate, bpm);

        Self {
            graph: SignalGraph::new(config.sample_rate, master_volume),
            config,
            patterns,
            current,
            bpm,
            looping: false,
            master_volume,
            bus: EventBus::new(),
            state: PlaybackState::Stopped,
            cursor: None,
            resolver: ResolverState::new(),
            next_row_time: 0.0,
            pending: VecDeque::new(),
            end_time: None,
            position: None,
            output_latency: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    /// Change the output sample rate. Only allowed while stopped; the
    /// output clock restarts at zero.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), EngineError> {
        if self.state != PlaybackState::Stopped {
            return Err(EngineError::NotStopped(self.state));
        }
        if sample_rate != self.graph.sample_rate() {
            log::debug!("sample rate {} -> {}", self.graph.sample_rate(), sample_rate);
            self.config.sample_rate = sample_rate;
            self.graph.reset(sample_rate);
        }
        Ok(())
    }

    // --- Events ---

    /// Subscribe to a topic. See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&EngineEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    fn emit(&self, event: EngineEvent) {
        self.bus.publish(&event);
    }

    // --- Patterns ---

    /// Add an empty pattern at the end of the table and the order, and
    /// make it current.
    pub fn create_pattern(&mut self, name: Option<&str>) -> Result<PatternId, EngineError> {
        let Some(id) = self.patterns.insert(name) else {
            log::warn!("pattern table full, not creating pattern");
            return Err(EngineError::PatternTableFull);
        };
        self.emit(EngineEvent::AddedPattern { pattern: id });
        self.emit(EngineEvent::ChangedPatternOrder);
        self.set_current_pattern(id)?;
        Ok(id)
    }

    /// Delete a pattern and its order entries. Unknown ids are ignored.
    /// The current pattern can only go through
    /// [`delete_current_pattern`](Self::delete_current_pattern).
    pub fn delete_pattern(&mut self, id: PatternId) -> Result<(), EngineError> {
        if id == self.current {
            return Err(EngineError::CurrentPatternDeletion(id));
        }
        let entries: Vec<usize> = self
            .patterns
            .order()
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == id)
            .map(|(i, _)| i)
            .collect();
        if self.patterns.remove(id).is_none() {
            log::debug!("delete of unknown pattern {:?} ignored", id);
            return Ok(());
        }
        if let Some(cursor) = &mut self.cursor {
            for index in entries.into_iter().rev() {
                cursor.order_entry_removed(index);
            }
        }
        self.emit(EngineEvent::DeletedPattern { pattern: id });
        self.emit(EngineEvent::ChangedPatternOrder);
        Ok(())
    }

    /// Delete the current pattern and make `replacement` current.
    pub fn delete_current_pattern(&mut self, replacement: PatternId) -> Result<(), EngineError> {
        if replacement == self.current || !self.patterns.contains(replacement) {
            return Err(EngineError::InvalidReplacement(replacement));
        }
        let deleted = self.current;
        self.set_current_pattern(replacement)?;
        self.delete_pattern(deleted)
    }

    pub fn current_pattern(&self) -> PatternId {
        self.current
    }

    pub fn set_current_pattern(&mut self, id: PatternId) -> Result<(), EngineError> {
        if !self.patterns.contains(id) {
            return Err(EngineError::UnknownPattern(id));
        }
        if id != self.current {
            self.current = id;
            self.emit(EngineEvent::ChangedCurrentPattern { pattern: id });
        }
        Ok(())
    }

    pub fn rename_pattern(&mut self, id: PatternId, name: &str) -> Result<(), EngineError> {
        let pattern = self.patterns.get_mut(id).ok_or(EngineError::UnknownPattern(id))?;
        pattern.set_name(name);
        self.emit(EngineEvent::RenamedPattern { pattern: id });
        Ok(())
    }

    /// Read-only view of a pattern.
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Id and name of every pattern, in creation order.
    pub fn patterns_metadata(&self) -> Vec<PatternMeta> {
        self.patterns.metadata()
    }

    // --- Cells ---

    /// Cell of a pattern.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn cell(
        &self,
        pattern: PatternId,
        channel: ChannelKind,
        row: usize,
    ) -> Result<Cell, EngineError> {
        let pattern = self
            .patterns
            .get(pattern)
            .ok_or(EngineError::UnknownPattern(pattern))?;
        Ok(pattern.cell(channel, row))
    }

    /// Replace a cell. The cell's shape must match the channel.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn set_cell(
        &mut self,
        pattern: PatternId,
        channel: ChannelKind,
        row: usize,
        cell: Cell,
    ) -> Result<(), EngineError> {
        let target = self.patterns.get_mut(pattern).ok_or(EngineError::UnknownPattern(pattern))?;
        target.set_cell(channel, row, cell)?;
        self.emit(EngineEvent::CellChanged { pattern, channel, row });
        Ok(())
    }

    /// Parse `token` into one field of a cell.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn set_cell_field(
        &mut self,
        pattern: PatternId,
        channel: ChannelKind,
        row: usize,
        field: CellField,
        token: &str,
    ) -> Result<(), EngineError> {
        let mut cell = self.cell(pattern, channel, row)?;
        cell.set_field(channel, field, token)?;
        self.set_cell(pattern, channel, row, cell)
    }

    /// Encoded token of one field of a cell.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS_PER_PATTERN`.
    pub fn cell_field_token(
        &self,
        pattern: PatternId,
        channel: ChannelKind,
        row: usize,
        field: CellField,
    ) -> Result<Token, EngineError> {
        self.cell(pattern, channel, row)?
            .field_token(field)
            .ok_or(EngineError::Field(pg_ir::FieldError::Unsupported { field, channel }))
    }

    /// Cell of the current pattern.
    pub fn cell_data(&self, row: usize, channel: ChannelKind) -> Cell {
        self.patterns
            .get(self.current)
            .map_or_else(|| Cell::empty(channel), |p| p.cell(channel, row))
    }

    /// Replace a cell of the current pattern.
    pub fn set_cell_data(
        &mut self,
        row: usize,
        channel: ChannelKind,
        cell: Cell,
    ) -> Result<(), EngineError> {
        self.set_cell(self.current, channel, row, cell)
    }

    // --- Pattern order ---

    pub fn pattern_order(&self) -> &[PatternId] {
        self.patterns.order()
    }

    pub fn set_pattern_order(&mut self, order: Vec<PatternId>) -> Result<(), EngineError> {
        self.patterns.set_order(order).map_err(EngineError::UnknownPattern)?;
        if let Some(cursor) = &mut self.cursor {
            cursor.order_replaced(self.patterns.order());
        }
        self.emit(EngineEvent::ChangedPatternOrder);
        Ok(())
    }

    pub fn append_to_order(&mut self, id: PatternId) -> Result<(), EngineError> {
        if !self.patterns.append_to_order(id) {
            return Err(EngineError::UnknownPattern(id));
        }
        self.emit(EngineEvent::ChangedPatternOrder);
        Ok(())
    }

    pub fn remove_order_entry(&mut self, index: usize) -> Result<PatternId, EngineError> {
        let id = self
            .patterns
            .remove_order_entry(index)
            .ok_or(EngineError::OrderIndexOutOfRange(index))?;
        if let Some(cursor) = &mut self.cursor {
            cursor.order_entry_removed(index);
        }
        self.emit(EngineEvent::ChangedPatternOrder);
        Ok(id)
    }

    // --- Global parameters ---

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo, clamped to the accepted range. Rows already
    /// scheduled keep their times. Returns the tempo in effect.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        let bpm = clamp_bpm(bpm);
        if bpm != self.bpm {
            self.bpm = bpm;
            self.emit(EngineEvent::ChangedBpm { bpm });
        }
        bpm
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        if looping != self.looping {
            self.looping = looping;
            self.emit(EngineEvent::ChangedLooping { looping });
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set the master gain (clamped to 0.0-1.0) from the current frame on.
    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        if volume != self.master_volume {
            self.master_volume = volume;
            self.graph.set_master_volume(volume);
            self.emit(EngineEvent::ChangedMasterVolume { volume });
        }
    }

    pub fn channel_enabled(&self, channel: ChannelKind) -> bool {
        self.graph.channel_enabled(channel)
    }

    pub fn set_channel_enabled(&mut self, channel: ChannelKind, enabled: bool) {
        if enabled != self.graph.channel_enabled(channel) {
            self.graph.set_channel_enabled(channel, enabled);
            self.emit(EngineEvent::ToggledChannel { channel, enabled });
        }
    }

    /// Flip a channel's gate. Returns the new state.
    pub fn toggle_channel(&mut self, channel: ChannelKind) -> bool {
        let enabled = !self.channel_enabled(channel);
        self.set_channel_enabled(channel, enabled);
        enabled
    }

    // --- Transport ---

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Last row reached by the output clock during this playback.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Output clock in seconds.
    pub fn now(&self) -> f64 {
        self.graph.now()
    }

    /// Tell the engine how many rendered frames sit in the output ahead of
    /// the listener. Rows are announced when they are heard, not when they
    /// are rendered.
    pub fn set_output_latency(&mut self, frames: u64) {
        self.output_latency = frames;
    }

    pub fn output_latency(&self) -> u64 {
        self.output_latency
    }

    /// Output clock minus the queued output, in seconds.
    fn heard_now(&self) -> f64 {
        self.now() - self.output_latency as f64 / f64::from(self.sample_rate().max(1))
    }

    /// Last-known field values of the rows scheduled so far.
    pub fn resolver(&self) -> &ResolverState {
        &self.resolver
    }

    fn check_transition(
        &self,
        request: Transport,
        allowed: &[PlaybackState],
    ) -> Result<(), EngineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            log::warn!("ignoring {:?} while {:?}", request, self.state);
            Err(EngineError::InvalidTransition { from: self.state, request })
        }
    }

    /// Start playback from `Stopped`.
    pub fn play(&mut self, options: PlayOptions) -> Result<(), EngineError> {
        self.check_transition(Transport::Play, &[PlaybackState::Stopped])?;

        let (pattern, order_index) = match options.mode {
            PlayMode::Song { order_index } if !self.patterns.order().is_empty() => {
                let id = self
                    .patterns
                    .order()
                    .get(order_index)
                    .copied()
                    .ok_or(EngineError::OrderIndexOutOfRange(order_index))?;
                if options.pattern.is_some() || options.end_row.is_some() {
                    log::warn!("song playback ignores the pattern and end row options");
                }
                (id, Some(order_index))
            }
            _ => (options.pattern.unwrap_or(self.current), None),
        };
        if !self.patterns.contains(pattern) {
            return Err(EngineError::UnknownPattern(pattern));
        }
        if let Some(looping) = options.looping {
            self.set_looping(looping);
        }

        let (start_row, end_row) = match order_index {
            Some(_) => (options.row_range().0, LAST_ROW),
            None => options.row_range(),
        };
        self.cursor = Some(Cursor::new(pattern, start_row, end_row, order_index));
        self.resolver = ResolverState::new();
        self.pending.clear();
        self.end_time = None;
        self.position = None;
        self.next_row_time = self.now();
        self.graph.set_held(false);
        self.state = PlaybackState::Playing;
        log::debug!(
            "playing {:?} rows {}..={} from {:.3}s",
            pattern,
            start_row,
            end_row,
            self.next_row_time
        );

        self.emit(EngineEvent::StartedPlayback { row: start_row, pattern });
        self.tick();
        Ok(())
    }

    /// Freeze playback. The output goes silent and the clock stops until
    /// [`resume`](Self::resume).
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.check_transition(Transport::Pause, &[PlaybackState::Playing])?;
        self.fire_due_rows(self.heard_now());
        self.graph.set_held(true);
        self.state = PlaybackState::Paused;
        let (row, pattern) = self.report_position();
        self.emit(EngineEvent::PausedPlayback { row, pattern });
        Ok(())
    }

    /// Continue from where [`pause`](Self::pause) froze playback.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.check_transition(Transport::Resume, &[PlaybackState::Paused])?;
        self.graph.set_held(false);
        self.state = PlaybackState::Playing;
        let (row, pattern) = self.report_position();
        self.emit(EngineEvent::ResumedPlayback { row, pattern });
        self.tick();
        Ok(())
    }

    /// Stop playback and cancel everything scheduled past the current frame.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.check_transition(Transport::Stop, &[PlaybackState::Playing, PlaybackState::Paused])?;
        self.halt();
        Ok(())
    }

    fn halt(&mut self) {
        let frame = self.graph.frame();
        self.graph.cancel_from(frame);
        self.graph.silence(frame);
        self.graph.set_held(false);
        self.pending.clear();
        self.cursor = None;
        self.end_time = None;
        self.position = None;
        self.state = PlaybackState::Stopped;
        log::debug!("stopped at {:.3}s", self.now());
        self.emit(EngineEvent::StoppedPlayback);
    }

    /// Row and pattern to report for pause/resume.
    fn report_position(&self) -> (usize, PatternId) {
        match (self.position, self.cursor) {
            (Some(pos), _) => (pos.row, pos.pattern),
            (None, Some(cursor)) => (cursor.start_row, cursor.position.pattern),
            (None, None) => (0, self.current),
        }
    }

    /// Advance the scheduler: queue rows inside the lookahead window,
    /// announce rows the clock has reached, and stop once playback has run
    /// out.
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let now = self.now();
        let horizon = now + self.config.lookahead.as_secs_f64();
        while self.end_time.is_none() && self.next_row_time < horizon {
            self.schedule_next_row();
        }
        self.fire_due_rows(self.heard_now());

        if self.end_time.is_some_and(|end| now >= end) && self.pending.is_empty() {
            log::debug!("playback ran out");
            self.halt();
        }
    }

    fn schedule_next_row(&mut self) {
        let Some(cursor) = self.cursor else {
            self.end_time = Some(self.next_row_time);
            return;
        };
        let pos = cursor.position;
        let Some(pattern) = self.patterns.get(pos.pattern) else {
            log::warn!("pattern {:?} disappeared during playback, ending", pos.pattern);
            self.end_time = Some(self.next_row_time);
            return;
        };

        let time = self.next_row_time;
        let frame = self.graph.frame_at(time);
        let resolved = self.resolver.resolve_row(pattern, pos.row);
        for (channel, params) in ChannelKind::ALL.into_iter().zip(resolved) {
            self.graph.schedule_row(channel, params, frame);
        }
        self.pending.push_back(PendingRow { time, position: pos });
        self.next_row_time += row_duration(self.bpm);

        match cursor.advance(self.patterns.order(), self.looping) {
            Some(next) => self.cursor = Some(next),
            None => self.end_time = Some(self.next_row_time),
        }
    }

    fn fire_due_rows(&mut self, heard: f64) {
        while let Some(row) = self.pending.front().copied() {
            if row.time > heard {
                break;
            }
            self.pending.pop_front();
            self.position = Some(row.position);
            self.emit(EngineEvent::PlayedRow {
                row: row.position.row,
                pattern: row.position.pattern,
                time: row.time,
            });
        }
    }

    // --- Rendering ---

    /// Render the next frames of output. Never allocates.
    pub fn render(&mut self, out: &mut [Frame]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.graph.render(out));
        #[cfg(not(feature = "alloc_check"))]
        self.graph.render(out);
    }

    /// Render `frames` frames offline, ticking the scheduler before every
    /// block as a host would.
    pub fn render_frames(&mut self, frames: usize) -> Vec<Frame> {
        let mut out = vec![Frame::silence(); frames];
        for block in out.chunks_mut(self.config.block_size.max(1)) {
            self.tick();
            self.render(block);
        }
        self.tick();
        out
    }

    /// Stop playback if needed and silence the graph.
    pub fn shutdown(&mut self) {
        if self.state != PlaybackState::Stopped {
            self.halt();
        }
        self.graph.silence(self.graph.frame());
        log::debug!("engine shut down");
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_ir::{NoteField, PulseCell, MAX_PATTERNS, ROWS_PER_PATTERN};
    use std::sync::{Arc, Mutex};

    type Recorded = Arc<Mutex<Vec<EngineEvent>>>;

    fn recorder(engine: &Engine, topics: &[Topic]) -> (Vec<Subscription>, Recorded) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subs = topics
            .iter()
            .map(|topic| {
                let events = events.clone();
                engine.subscribe(*topic, move |e| {
                    events.lock().unwrap().push(*e);
                    Ok(())
                })
            })
            .collect();
        (subs, events)
    }

    #[test]
    fn starts_with_one_current_pattern() {
        let engine = Engine::default();
        let meta = engine.patterns_metadata();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].id, engine.current_pattern());
        assert_eq!(meta[0].name.as_str(), "Pattern 1");
        assert_eq!(engine.pattern_order(), &[engine.current_pattern()]);
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn create_pattern_becomes_current() {
        let mut engine = Engine::default();
        let (_subs, events) =
            recorder(&engine, &[Topic::AddedPattern, Topic::ChangedCurrentPattern]);
        let id = engine.create_pattern(Some("Bridge")).unwrap();

        assert_eq!(engine.current_pattern(), id);
        assert_eq!(engine.pattern(id).unwrap().name(), "Bridge");
        assert_eq!(
            *events.lock().unwrap(),
            [
                EngineEvent::AddedPattern { pattern: id },
                EngineEvent::ChangedCurrentPattern { pattern: id },
            ]
        );
    }

    #[test]
    fn create_pattern_at_capacity_is_a_noop() {
        let mut engine = Engine::default();
        while engine.pattern_count() < MAX_PATTERNS {
            engine.create_pattern(None).unwrap();
        }
        let current = engine.current_pattern();
        assert_eq!(engine.create_pattern(None), Err(EngineError::PatternTableFull));
        assert_eq!(engine.pattern_count(), MAX_PATTERNS);
        assert_eq!(engine.current_pattern(), current);
    }

    #[test]
    fn current_pattern_needs_a_replacement_to_be_deleted() {
        let mut engine = Engine::default();
        let first = engine.current_pattern();
        let second = engine.create_pattern(None).unwrap();

        assert_eq!(
            engine.delete_pattern(second),
            Err(EngineError::CurrentPatternDeletion(second))
        );
        assert_eq!(
            engine.delete_current_pattern(second),
            Err(EngineError::InvalidReplacement(second))
        );

        engine.delete_current_pattern(first).unwrap();
        assert_eq!(engine.current_pattern(), first);
        assert!(engine.pattern(second).is_none());
        assert_eq!(engine.pattern_order(), &[first]);
    }

    #[test]
    fn deleting_unknown_pattern_is_a_noop() {
        let mut engine = Engine::default();
        let extra = engine.create_pattern(None).unwrap();
        let first = engine.patterns_metadata()[0].id;
        engine.set_current_pattern(first).unwrap();
        engine.delete_pattern(extra).unwrap();
        assert_eq!(engine.delete_pattern(extra), Ok(()));
        assert_eq!(engine.pattern_count(), 1);
    }

    #[test]
    fn set_cell_emits_cell_changed() {
        let mut engine = Engine::default();
        let (_subs, events) = recorder(&engine, &[Topic::CellChanged]);
        let pattern = engine.current_pattern();
        engine
            .set_cell_field(pattern, ChannelKind::Pulse1, 3, CellField::Note, "D#5")
            .unwrap();

        assert_eq!(
            engine
                .cell_field_token(pattern, ChannelKind::Pulse1, 3, CellField::Note)
                .unwrap()
                .as_str(),
            "D#5"
        );
        assert_eq!(
            *events.lock().unwrap(),
            [EngineEvent::CellChanged { pattern, channel: ChannelKind::Pulse1, row: 3 }]
        );
    }

    #[test]
    fn rejected_edits_leave_cells_alone() {
        let mut engine = Engine::default();
        let pattern = engine.current_pattern();
        let wave = Cell::empty(ChannelKind::Wave);
        assert!(matches!(
            engine.set_cell(pattern, ChannelKind::Noise, 0, wave),
            Err(EngineError::CellKindMismatch(_))
        ));
        assert!(matches!(
            engine.set_cell_field(pattern, ChannelKind::Noise, 0, CellField::Rate, "x1"),
            Err(EngineError::Field(_))
        ));
        assert!(engine.cell_data(0, ChannelKind::Noise).is_empty());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_row_panics() {
        let engine = Engine::default();
        let _ = engine.cell(engine.current_pattern(), ChannelKind::Wave, ROWS_PER_PATTERN);
    }

    #[test]
    fn invalid_transitions_are_reported() {
        let mut engine = Engine::default();
        assert_eq!(
            engine.pause(),
            Err(EngineError::InvalidTransition {
                from: PlaybackState::Stopped,
                request: Transport::Pause
            })
        );
        assert!(engine.resume().is_err());
        assert!(engine.stop().is_err());

        engine.play(PlayOptions::new()).unwrap();
        assert!(engine.play(PlayOptions::new()).is_err());
        assert!(engine.resume().is_err());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn bpm_is_clamped_and_announced_once() {
        let mut engine = Engine::default();
        let (_subs, events) = recorder(&engine, &[Topic::ChangedBpm]);
        assert_eq!(engine.set_bpm(500.0), 300.0);
        assert_eq!(engine.set_bpm(300.0), 300.0);
        assert_eq!(*events.lock().unwrap(), [EngineEvent::ChangedBpm { bpm: 300.0 }]);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut engine = Engine::new(EngineConfig::default().with_bpm(120.0));
        let pattern = engine.current_pattern();
        let cell = PulseCell { note: NoteField::On("A-4".parse().unwrap()), ..Default::default() };
        engine.set_cell_data(0, ChannelKind::Pulse1, cell.into()).unwrap();
        engine.play(PlayOptions::new()).unwrap();
        engine.render_frames(4410);

        engine.pause().unwrap();
        let frozen = engine.now();
        let silent = engine.render_frames(4410);
        assert!(silent.iter().all(Frame::is_silent));
        assert_eq!(engine.now(), frozen);
        assert_eq!(engine.position().map(|p| p.pattern), Some(pattern));

        engine.resume().unwrap();
        let out = engine.render_frames(4410);
        assert!(out.iter().any(|f| !f.is_silent()));
        assert!(engine.now() > frozen);
    }

    #[test]
    fn sample_rate_changes_only_while_stopped() {
        let mut engine = Engine::default();
        engine.set_sample_rate(48000).unwrap();
        assert_eq!(engine.sample_rate(), 48000);
        engine.play(PlayOptions::new()).unwrap();
        assert_eq!(
            engine.set_sample_rate(22050),
            Err(EngineError::NotStopped(PlaybackState::Playing))
        );
    }

    #[test]
    fn song_mode_with_empty_order_plays_current_pattern() {
        let mut engine = Engine::default();
        engine.set_pattern_order(Vec::new()).unwrap();
        engine.play(PlayOptions::song()).unwrap();
        assert_eq!(engine.position().map(|p| (p.row, p.order_index)), Some((0, None)));
    }

    #[test]
    fn song_mode_rejects_bad_order_index() {
        let mut engine = Engine::default();
        let options = PlayOptions { mode: PlayMode::Song { order_index: 3 }, ..PlayOptions::new() };
        assert_eq!(engine.play(options), Err(EngineError::OrderIndexOutOfRange(3)));
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn deleting_the_playing_pattern_ends_playback() {
        let mut engine = Engine::default();
        let playing = engine.current_pattern();
        let other = engine.create_pattern(None).unwrap();
        engine.play(PlayOptions::new().pattern(playing)).unwrap();
        assert_eq!(engine.current_pattern(), other);

        engine.delete_pattern(playing).unwrap();
        engine.render_frames(engine.sample_rate() as usize);
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn played_rows_wait_for_queued_output() {
        let mut engine = Engine::default();
        let (_subs, events) = recorder(&engine, &[Topic::PlayedRow]);
        engine.set_output_latency(4410);
        engine.play(PlayOptions::new()).unwrap();
        assert!(events.lock().unwrap().is_empty());

        engine.render_frames(4000);
        assert!(events.lock().unwrap().is_empty());
        engine.render_frames(1000);
        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(engine.position().map(|p| p.row), Some(0));
    }

    #[test]
    fn song_mode_ignores_pattern_and_end_row() {
        let mut engine = Engine::default();
        let first = engine.current_pattern();
        let other = engine.create_pattern(None).unwrap();
        engine.set_pattern_order(vec![first]).unwrap();

        engine.play(PlayOptions::song().pattern(other).rows(60, 61)).unwrap();
        let pos = engine.position().unwrap();
        assert_eq!((pos.pattern, pos.row, pos.order_index), (first, 60, Some(0)));
        // Row 63 starts at 0.375s at the default tempo.
        engine.render_frames(17640);
        let pos = engine.position().unwrap();
        assert_eq!((pos.pattern, pos.row), (first, 63));
    }
}
