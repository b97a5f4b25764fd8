// EditorSession - The API the UI layer talks to
//
// Owns one of everything: the canonical store, the history, the position
// synchronizer, the volume controller, the frame scheduler and the engine.
// UI callbacks never write region bounds anywhere else.

use crate::config::{ConfigResult, EditorConfig, REGION_SIGNIFICANCE_THRESHOLD};
use crate::engine::{EngineError, EngineResult, PlaybackEngine};
use crate::history::{HistoryResult, RegionHistory, RegionTarget, SnapshotSource};
use crate::messaging::{EventConsumer, EventProducer, UiEvent, create_event_channel, push_event};
use crate::orchestrator::{VolumeContext, VolumeController, VolumeUpdate};
use crate::region::{InteractionMode, Region, RegionUpdate, StoreResult, WaveformStore};
use crate::render::{OutputFormat, RenderJob, RenderResult};
use crate::scheduler::{FrameScheduler, ScheduledTask};
use crate::sync::{
    PositionSynchronizer, SyncError, SyncOutcome, SyncResult, SyncSource, SyncTargets, TargetError,
};
use crate::timing::{Clock, SystemClock};
use crate::volume::{CustomGains, VolumeProfile};
use std::sync::Arc;
use std::time::Duration;

/// External "time updated" listener, invoked after the UI setters
pub type TimeCallback = Box<dyn FnMut(f64) -> Result<(), TargetError>>;

/// Session error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Which edge of the region a click moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionEdge {
    Start,
    End,
}

pub struct EditorSession<E: PlaybackEngine> {
    config: EditorConfig,
    store: WaveformStore,
    history: RegionHistory,
    synchronizer: PositionSynchronizer,
    scheduler: FrameScheduler,
    controller: VolumeController,
    engine: E,
    events: EventProducer,
    time_callback: Option<TimeCallback>,
    drag: Option<DragState>,
}

/// Bookkeeping for the drag in progress
struct DragState {
    origin: Option<Region>,
    recorded: bool,
    /// History as it was when the drag began
    history_before: RegionHistory,
}

impl<E: PlaybackEngine> EditorSession<E> {
    /// Create a session and the consumer side of its UI event channel
    pub fn new(engine: E, config: EditorConfig, clock: Arc<dyn Clock>) -> ConfigResult<(Self, EventConsumer)> {
        config.validate()?;
        let (events, consumer) = create_event_channel(config.event_capacity);

        let session = Self {
            store: WaveformStore::from_config(&config),
            history: RegionHistory::with_capacity(config.history_limit),
            synchronizer: PositionSynchronizer::new(clock.clone(), config.sync_interval()),
            scheduler: FrameScheduler::new(clock),
            controller: VolumeController::new(config.redraw_interval()),
            engine,
            events,
            time_callback: None,
            drag: None,
            config,
        };
        Ok((session, consumer))
    }

    pub fn with_system_clock(engine: E, config: EditorConfig) -> ConfigResult<(Self, EventConsumer)> {
        Self::new(engine, config, Arc::new(SystemClock::new()))
    }

    pub fn set_time_update_callback(&mut self, callback: TimeCallback) {
        self.time_callback = Some(callback);
    }

    // --- Volume -------------------------------------------------------------

    /// Recompute the preview gain (see `VolumeController::update_volume`)
    pub fn update_volume(
        &mut self,
        position: Option<f64>,
        force_update: bool,
        force_redraw: bool,
    ) -> VolumeUpdate {
        let mut ctx = VolumeContext {
            store: &self.store,
            engine: &mut self.engine,
            synchronizer: &self.synchronizer,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
        };
        self.controller
            .update_volume(&mut ctx, position, force_update, force_redraw)
    }

    pub fn set_volume(&mut self, volume: f32) -> StoreResult<()> {
        self.store.set_volume(volume)?;
        self.request_volume_refresh();
        Ok(())
    }

    pub fn set_profile(&mut self, profile: VolumeProfile) {
        self.store.set_profile(profile);
        self.request_volume_refresh();
    }

    pub fn set_custom_gains(&mut self, gains: CustomGains) {
        self.store.set_custom_gains(gains);
        self.request_volume_refresh();
    }

    pub fn set_fade_in(&mut self, enabled: bool) {
        self.store.set_fade_in_enabled(enabled);
        self.request_volume_refresh();
    }

    pub fn set_fade_out(&mut self, enabled: bool) {
        self.store.set_fade_out_enabled(enabled);
        self.request_volume_refresh();
    }

    pub fn set_fade_in_duration(&mut self, seconds: f64) -> StoreResult<()> {
        self.store.set_fade_in_duration(seconds)?;
        self.request_volume_refresh();
        Ok(())
    }

    pub fn set_fade_out_duration(&mut self, seconds: f64) -> StoreResult<()> {
        self.store.set_fade_out_duration(seconds)?;
        self.request_volume_refresh();
        Ok(())
    }

    /// Debounced forced update; a newer slider tick replaces the pending one
    fn request_volume_refresh(&mut self) {
        self.scheduler
            .schedule(ScheduledTask::ForceVolumeUpdate, self.config.param_debounce());
    }

    // --- Region -------------------------------------------------------------

    pub fn region_bounds(&self) -> Option<Region> {
        self.store.region_bounds()
    }

    /// Programmatically replace the region (no history entry)
    ///
    /// Returns `false` for invalid bounds, while a drag is active, or if the
    /// engine refuses the region; the previous region is kept in all cases.
    pub fn set_region_bounds(&mut self, start: f64, end: f64) -> bool {
        let applied = {
            let mut live = self.live_region();
            live.apply_region(start, end)
        };
        if applied {
            self.update_volume(None, true, true);
        }
        applied
    }

    /// Reset the region to the whole file, recording the previous one
    pub fn reset_region(&mut self) -> bool {
        let duration = self.engine.duration();
        if !duration.is_finite() || duration <= 0.0 {
            log::warn!("Cannot reset region: no audio loaded");
            return false;
        }
        let checkpoint = self.history.clone();
        let recorded = self.store.region_bounds().is_some_and(|current| {
            self.history
                .record_before_change(current.start(), current.end(), SnapshotSource::Reset)
        });

        if !self.set_region_bounds(0.0, duration) {
            self.history = checkpoint;
            return false;
        }
        if recorded {
            self.notify_history();
        }
        true
    }

    /// Single entry point for region reports from the UI editors
    pub fn update_from_external_event(
        &mut self,
        start: f64,
        end: f64,
        should_record_history: bool,
        source: SnapshotSource,
    ) -> RegionUpdate {
        // Edits that did not originate in the player widget must reach it
        // before they become canonical
        if !matches!(source, SnapshotSource::Drag | SnapshotSource::Engine)
            && let Ok(candidate) = Region::try_new(start, end)
            && let Err(err) = self.push_region_to_engine(candidate)
        {
            log::error!("Region edit from {} refused by the engine: {}", source, err);
            return RegionUpdate::Rejected;
        }

        let update = self.store.update_from_external_event(
            start,
            end,
            should_record_history,
            source,
            &mut self.history,
        );

        if let RegionUpdate::Applied { recorded } = update {
            push_event(&mut self.events, UiEvent::RegionChanged { start, end });
            if recorded {
                self.notify_history();
            }
            self.update_volume(None, true, false);
        }
        update
    }

    /// Start dragging a region edge
    pub fn begin_drag(&mut self) -> StoreResult<()> {
        self.store.transition(InteractionMode::Dragging)?;
        self.drag = Some(DragState {
            origin: self.store.region_bounds(),
            recorded: false,
            history_before: self.history.clone(),
        });
        Ok(())
    }

    /// Intermediate drag position
    ///
    /// The region as it was when the drag began is recorded once, on the
    /// first move that is larger than the significance threshold.
    pub fn drag_to(&mut self, start: f64, end: f64) -> RegionUpdate {
        if !self.store.is_dragging() {
            return self.update_from_external_event(start, end, true, SnapshotSource::Drag);
        }

        let mut recorded = false;
        if let Some(drag) = self.drag.as_mut()
            && !drag.recorded
            && let Some(origin) = drag.origin
            && let Ok(candidate) = Region::try_new(start, end)
            && origin.differs_from(&candidate, REGION_SIGNIFICANCE_THRESHOLD)
        {
            recorded = self
                .history
                .record_before_change(origin.start(), origin.end(), SnapshotSource::Drag);
            drag.recorded = true;
        }
        if recorded {
            self.notify_history();
        }

        let update = self.store.update_from_external_event(
            start,
            end,
            false,
            SnapshotSource::Drag,
            &mut self.history,
        );
        if update.is_significant() {
            push_event(&mut self.events, UiEvent::RegionChanged { start, end });
            self.update_volume(None, true, false);
        }
        update
    }

    /// Finish the drag and make sure the player holds the dragged region
    ///
    /// If the player refuses it, the store falls back to the player's region
    /// and a drag that ends where it started leaves no history behind.
    pub fn end_drag(&mut self) {
        if self.store.is_dragging() {
            self.store.finish_interaction();
        }
        let drag = self.drag.take();

        if let Some(region) = self.store.region_bounds()
            && let Err(err) = self.push_region_to_engine(region)
        {
            log::error!("Engine refused dragged region {}..{}: {}", region.start(), region.end(), err);
            let origin = drag.as_ref().and_then(|drag| drag.origin);
            match self.engine.region().or(origin) {
                Some(fallback) => {
                    self.store.set_region_bounds(fallback.start(), fallback.end());
                }
                None => self.store.clear_region(),
            }

            if let Some(drag) = drag
                && drag.recorded
                && origin.is_some_and(|origin| {
                    self.store
                        .region_bounds()
                        .is_some_and(|now| !now.differs_from(&origin, REGION_SIGNIFICANCE_THRESHOLD))
                })
            {
                self.history = drag.history_before;
                self.notify_history();
            }
        }

        if let Some(region) = self.store.region_bounds() {
            push_event(
                &mut self.events,
                UiEvent::RegionChanged {
                    start: region.start(),
                    end: region.end(),
                },
            );
        }
        self.update_volume(None, true, true);
    }

    /// Move one edge of the region to `time` in response to a click
    ///
    /// The click mode stays active until the engine has settled, so the
    /// reconciliation that follows does not record the change again.
    pub fn click_edge(&mut self, edge: RegionEdge, time: f64) -> RegionUpdate {
        let Some(current) = self.store.region_bounds() else {
            return RegionUpdate::Rejected;
        };
        let (start, end) = match edge {
            RegionEdge::Start => (time, current.end()),
            RegionEdge::End => (current.start(), time),
        };

        if let Err(err) = self.store.transition(InteractionMode::ClickSeeking) {
            log::warn!("Click on region edge ignored: {}", err);
            return RegionUpdate::Rejected;
        }

        let update = self.update_from_external_event(start, end, true, SnapshotSource::Click);
        self.scheduler
            .schedule(ScheduledTask::SettleInteraction, self.config.settle_delay());
        update
    }

    // --- History ------------------------------------------------------------

    pub fn undo(&mut self) -> HistoryResult<Region> {
        let (history, mut live) = self.history_and_live_region();
        let result = history.undo(&mut live);
        self.after_history_step(&result);
        result
    }

    pub fn redo(&mut self) -> HistoryResult<Region> {
        let (history, mut live) = self.history_and_live_region();
        let result = history.redo(&mut live);
        self.after_history_step(&result);
        result
    }

    fn after_history_step(&mut self, result: &HistoryResult<Region>) {
        match result {
            Ok(region) => {
                log::debug!("Region restored to {}..{}", region.start(), region.end());
                self.notify_history();
                self.update_volume(None, true, true);
            }
            Err(err) => log::warn!("History step failed: {}", err),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn notify_history(&mut self) {
        push_event(
            &mut self.events,
            UiEvent::HistoryChanged {
                can_undo: self.history.can_undo(),
                can_redo: self.history.can_redo(),
            },
        );
    }

    // --- Playback -----------------------------------------------------------

    /// Position report from the engine (animation frame or time update)
    pub fn on_position_tick(&mut self, position: f64) -> SyncResult<SyncOutcome> {
        let outcome = self.sync_position(position, SyncSource::Tick)?;
        if outcome.is_applied() {
            self.update_volume(Some(position), false, false);
        }
        Ok(outcome)
    }

    /// Fan a position out to the shared cell, the time display and the
    /// external callback
    pub fn sync_position(
        &mut self,
        position: f64,
        source: SyncSource,
    ) -> SyncResult<SyncOutcome> {
        let events = &mut self.events;
        let mut targets = SyncTargets::new()
            .with_ref(self.store.position_cell())
            .with_setter("time_display", move |p| {
                push_event(events, UiEvent::TimeDisplay(p));
                Ok(())
            });
        if let Some(callback) = self.time_callback.as_mut() {
            targets = targets.with_callback(move |p| callback(p));
        }

        self.synchronizer
            .sync(position, source, targets)
            .inspect_err(|err| log::error!("Position sync from {} failed: {}", source, err))
    }

    /// Seek the engine to an absolute position in seconds
    ///
    /// A failing position target is reported after the gain has been
    /// updated; the engine has already moved by then.
    pub fn seek(&mut self, position: f64) -> SessionResult<()> {
        let duration = self.engine.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EngineError::NotReady("no audio loaded".into()).into());
        }
        if !position.is_finite() {
            return Err(EngineError::InvalidArgument {
                operation: "seek",
                value: position,
            }
            .into());
        }

        let position = position.clamp(0.0, duration);
        if let Err(err) = self.engine.seek_to(position / duration) {
            log::error!("Seek to {:.3}s failed: {}", position, err);
            return Err(err.into());
        }

        let synced = self.sync_position(position, SyncSource::Force);
        self.update_volume(Some(position), true, false);
        synced?;
        Ok(())
    }

    pub fn play(&mut self) -> EngineResult<()> {
        self.engine.play()?;
        self.store.set_playing(true);
        self.update_volume(None, true, false);
        Ok(())
    }

    pub fn pause(&mut self) -> EngineResult<()> {
        self.engine.pause()?;
        self.store.set_playing(false);
        Ok(())
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.store.set_loop_enabled(enabled);
    }

    /// Change the preview speed; returns the rate actually applied
    pub fn set_speed(&mut self, rate: f64) -> EngineResult<f64> {
        let rate = self.config.clamp_speed(rate);
        VolumeController::change_speed(&mut self.engine, rate)?;
        self.store
            .set_speed(rate)
            .map_err(|_| EngineError::InvalidArgument {
                operation: "set_speed",
                value: rate,
            })?;
        Ok(rate)
    }

    // --- Frame loop ----------------------------------------------------------

    /// Run once per animation frame: reconcile engine region events and run
    /// due scheduled tasks. Returns the tasks that fired.
    pub fn poll(&mut self) -> Vec<ScheduledTask> {
        for region in self.engine.take_region_events() {
            let update = self.store.update_from_external_event(
                region.start(),
                region.end(),
                false,
                SnapshotSource::Engine,
                &mut self.history,
            );
            if update.is_significant() {
                push_event(
                    &mut self.events,
                    UiEvent::RegionChanged {
                        start: region.start(),
                        end: region.end(),
                    },
                );
                self.update_volume(None, true, false);
            }
        }

        let due = self.scheduler.poll();
        for task in &due {
            match task {
                ScheduledTask::Redraw => {
                    push_event(&mut self.events, UiEvent::RedrawRequested);
                }
                ScheduledTask::ForceVolumeUpdate => {
                    self.update_volume(None, true, true);
                }
                ScheduledTask::SettleInteraction => {
                    if matches!(
                        self.store.mode(),
                        InteractionMode::ClickSeeking | InteractionMode::ProgrammaticUpdate
                    ) {
                        self.store.finish_interaction();
                    }
                }
            }
        }
        due
    }

    /// Cancel all pending work (component teardown)
    pub fn teardown(&mut self) {
        self.scheduler.cancel_all();
        self.store.finish_interaction();
        self.controller.reset();
        self.drag = None;
    }

    // --- Render handoff --------------------------------------------------------

    pub fn render_job(&self, output_format: OutputFormat) -> RenderResult<RenderJob> {
        RenderJob::from_store(&self.store, output_format)
    }

    // --- Accessors ---------------------------------------------------------------

    pub fn store(&self) -> &WaveformStore {
        &self.store
    }

    pub fn history(&self) -> &RegionHistory {
        &self.history
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn controller(&self) -> &VolumeController {
        &self.controller
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Shorthand for the current playhead as last synchronized
    pub fn position(&self) -> f64 {
        self.store.position()
    }

    pub fn sync_interval(&self) -> Duration {
        self.synchronizer.min_interval()
    }

    fn live_region(&mut self) -> LiveRegion<'_> {
        self.history_and_live_region().1
    }

    fn history_and_live_region(&mut self) -> (&mut RegionHistory, LiveRegion<'_>) {
        let settle_delay = self.config.settle_delay();
        let live = LiveRegion {
            store: &mut self.store,
            engine: &mut self.engine,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
            settle_delay,
        };
        (&mut self.history, live)
    }

    fn push_region_to_engine(&mut self, region: Region) -> EngineResult<()> {
        let in_sync = self
            .engine
            .region()
            .is_some_and(|engine_region| !engine_region.differs_from(&region, f64::EPSILON));
        if in_sync {
            return Ok(());
        }
        self.engine.set_region(region.start(), region.end())
    }
}

/// Store + engine view used as the undo/redo target
struct LiveRegion<'a> {
    store: &'a mut WaveformStore,
    engine: &'a mut dyn PlaybackEngine,
    scheduler: &'a mut FrameScheduler,
    events: &'a mut EventProducer,
    settle_delay: Duration,
}

impl RegionTarget for LiveRegion<'_> {
    /// The store owns the canonical bounds
    fn current_region(&self) -> Option<Region> {
        self.store.region_bounds().or_else(|| self.engine.region())
    }

    /// Programmatic update: engine first, then the canonical bounds
    fn apply_region(&mut self, start: f64, end: f64) -> bool {
        if Region::try_new(start, end).is_err() {
            log::warn!("Refusing region {}..{}", start, end);
            return false;
        }
        let previous_mode = self.store.mode();
        if let Err(err) = self.store.transition(InteractionMode::ProgrammaticUpdate) {
            log::warn!("Programmatic region update refused: {}", err);
            return false;
        }
        if let Err(err) = self.engine.set_region(start, end) {
            log::error!("Engine refused region {}..{}: {}", start, end, err);
            self.store.finish_interaction();
            if let Err(err) = self.store.transition(previous_mode) {
                log::warn!("Could not restore interaction mode: {}", err);
            }
            return false;
        }

        let applied = self.store.set_region_bounds(start, end);
        self.scheduler
            .schedule(ScheduledTask::SettleInteraction, self.settle_delay);
        if applied {
            push_event(self.events, UiEvent::RegionChanged { start, end });
        }
        applied
    }
}
