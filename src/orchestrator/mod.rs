// Volume orchestrator - Decides when the audible gain has to change
//
// On every position tick or parameter change: resolve the playhead, compute
// the profile gain for the live region, push it to the engine if it moved,
// and ask for a redraw through the frame scheduler.

use crate::config::GAIN_CHANGE_EPSILON;
use crate::engine::{EngineResult, PlaybackEngine};
use crate::messaging::{EventProducer, UiEvent, push_event};
use crate::region::WaveformStore;
use crate::scheduler::{FrameScheduler, ScheduledTask};
use crate::sync::{PositionSynchronizer, SharedGain};
use crate::volume::compute_gain;
use std::time::Duration;

/// Why an update was abandoned without touching the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAbort {
    NoRegion,
    InvalidRegion,
    InvalidPosition,
    InvalidGain,
    EngineFailed,
}

/// Outcome of `VolumeController::update_volume`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeUpdate {
    Aborted(VolumeAbort),
    /// Gain within epsilon of the last applied value; engine not called
    Unchanged { gain: f32, redraw_scheduled: bool },
    Applied { gain: f32, redraw_scheduled: bool },
}

impl VolumeUpdate {
    pub fn gain(&self) -> Option<f32> {
        match self {
            VolumeUpdate::Aborted(_) => None,
            VolumeUpdate::Unchanged { gain, .. } | VolumeUpdate::Applied { gain, .. } => Some(*gain),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, VolumeUpdate::Applied { .. })
    }

    pub fn redraw_scheduled(&self) -> bool {
        match self {
            VolumeUpdate::Aborted(_) => false,
            VolumeUpdate::Unchanged {
                redraw_scheduled, ..
            }
            | VolumeUpdate::Applied {
                redraw_scheduled, ..
            } => *redraw_scheduled,
        }
    }
}

/// Everything an update reads or writes besides the controller's own state
pub struct VolumeContext<'a> {
    pub store: &'a WaveformStore,
    pub engine: &'a mut dyn PlaybackEngine,
    pub synchronizer: &'a PositionSynchronizer,
    pub scheduler: &'a mut FrameScheduler,
    pub events: &'a mut EventProducer,
}

pub struct VolumeController {
    last_gain: Option<f32>,
    last_position: Option<f64>,
    redraw_delay: Duration,
    display: SharedGain,
}

impl VolumeController {
    pub fn new(redraw_delay: Duration) -> Self {
        Self {
            last_gain: None,
            last_position: None,
            redraw_delay,
            display: SharedGain::default(),
        }
    }

    /// Recompute the preview gain and apply it if needed
    ///
    /// Position: `absolute_position` if given, else the engine time while
    /// playing, else the synchronizer's last position. Invalid region or
    /// position aborts without touching the engine.
    pub fn update_volume(
        &mut self,
        ctx: &mut VolumeContext<'_>,
        absolute_position: Option<f64>,
        force_update: bool,
        force_redraw: bool,
    ) -> VolumeUpdate {
        let position = match absolute_position {
            Some(position) => position,
            None if ctx.engine.is_playing() => ctx.engine.current_time(),
            None => ctx.synchronizer.last_position(),
        };

        let Some(region) = ctx.store.region_bounds() else {
            log::debug!("Volume update skipped: no region selected");
            return VolumeUpdate::Aborted(VolumeAbort::NoRegion);
        };
        let (start, end) = (region.start(), region.end());
        if !start.is_finite() || !end.is_finite() || end <= start {
            log::error!("Volume update aborted: invalid region {}..{}", start, end);
            return VolumeUpdate::Aborted(VolumeAbort::InvalidRegion);
        }
        if !position.is_finite() {
            log::error!("Volume update aborted: invalid position {}", position);
            return VolumeUpdate::Aborted(VolumeAbort::InvalidPosition);
        }

        let relative = ((position - start) / (end - start)).clamp(0.0, 1.0);
        let Some(params) = ctx.store.gain_params() else {
            return VolumeUpdate::Aborted(VolumeAbort::NoRegion);
        };
        let gain = compute_gain(relative, &ctx.store.profile(), &params);
        if !gain.is_finite() {
            log::error!("Volume update aborted: calculator returned {}", gain);
            return VolumeUpdate::Aborted(VolumeAbort::InvalidGain);
        }

        let changed = self
            .last_gain
            .is_none_or(|last| (gain - last).abs() >= GAIN_CHANGE_EPSILON);

        let applied = if changed || force_update {
            if let Err(err) = ctx.engine.set_volume(gain) {
                log::error!("Failed to apply gain {:.3}: {}", gain, err);
                return VolumeUpdate::Aborted(VolumeAbort::EngineFailed);
            }
            self.display.set(gain);
            push_event(ctx.events, UiEvent::VolumeDisplay(gain));
            self.last_gain = Some(gain);
            self.last_position = Some(position);
            true
        } else {
            false
        };

        let redraw_scheduled =
            force_redraw || (changed && !ctx.store.mode().suppresses_redraw());
        if redraw_scheduled {
            ctx.scheduler
                .schedule(ScheduledTask::Redraw, self.redraw_delay);
        }

        if applied {
            VolumeUpdate::Applied {
                gain,
                redraw_scheduled,
            }
        } else {
            VolumeUpdate::Unchanged {
                gain,
                redraw_scheduled,
            }
        }
    }

    /// Change the playback rate, falling back to pause/set/reseek/resume
    ///
    /// Only returns an error if the fallback sequence fails too.
    pub fn change_speed(engine: &mut dyn PlaybackEngine, rate: f64) -> EngineResult<()> {
        let first_error = match engine.set_playback_rate(rate) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        log::warn!(
            "Playback rate {} refused ({}), retrying with pause/reseek",
            rate,
            first_error
        );

        let was_playing = engine.is_playing();
        let position = engine.current_time();
        let duration = engine.duration();

        if was_playing {
            engine.pause()?;
        }

        let result = engine.set_playback_rate(rate).and_then(|()| {
            if duration > 0.0 && position.is_finite() {
                engine.seek_to((position / duration).clamp(0.0, 1.0))
            } else {
                Ok(())
            }
        });

        if was_playing && let Err(err) = engine.play() {
            log::error!("Could not resume playback after rate change: {}", err);
            return result.and(Err(err));
        }

        if let Err(err) = &result {
            log::error!("Playback rate fallback failed: {}", err);
        }
        result
    }

    /// Forget the last applied gain so the next update always reaches the engine
    pub fn reset(&mut self) {
        self.last_gain = None;
        self.last_position = None;
    }

    pub fn last_gain(&self) -> Option<f32> {
        self.last_gain
    }

    pub fn last_position(&self) -> Option<f64> {
        self.last_position
    }

    /// Shared cell with the last applied gain, for synchronous readers
    pub fn display_gain(&self) -> &SharedGain {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use crate::messaging::{create_event_channel, drain_events};
    use crate::region::InteractionMode;
    use crate::timing::ManualClock;
    use crate::volume::VolumeProfile;
    use std::sync::Arc;

    struct Fixture {
        clock: ManualClock,
        store: WaveformStore,
        engine: SimulatedEngine,
        synchronizer: PositionSynchronizer,
        scheduler: FrameScheduler,
        events: EventProducer,
        consumer: crate::messaging::EventConsumer,
        controller: VolumeController,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = ManualClock::new();
            let shared: Arc<dyn crate::timing::Clock> = Arc::new(clock.clone());
            let (events, consumer) = create_event_channel(64);
            let mut store = WaveformStore::default();
            store.set_region_bounds(2.0, 10.0);
            Self {
                clock,
                store,
                engine: SimulatedEngine::new(60.0),
                synchronizer: PositionSynchronizer::new(shared.clone(), Duration::from_millis(16)),
                scheduler: FrameScheduler::new(shared),
                events,
                consumer,
                controller: VolumeController::new(Duration::from_millis(16)),
            }
        }

        fn update(&mut self, position: Option<f64>, force: bool, redraw: bool) -> VolumeUpdate {
            let mut ctx = VolumeContext {
                store: &self.store,
                engine: &mut self.engine,
                synchronizer: &self.synchronizer,
                scheduler: &mut self.scheduler,
                events: &mut self.events,
            };
            self.controller.update_volume(&mut ctx, position, force, redraw)
        }
    }

    #[test]
    fn test_applies_gain_and_schedules_redraw() {
        let mut fx = Fixture::new();
        fx.store.set_volume(0.6).unwrap();

        let update = fx.update(Some(4.0), false, false);
        assert_eq!(
            update,
            VolumeUpdate::Applied {
                gain: 0.6,
                redraw_scheduled: true
            }
        );
        assert_eq!(fx.engine.volume(), 0.6);
        assert_eq!(fx.controller.display_gain().get(), 0.6);
        assert!(fx.scheduler.is_pending(ScheduledTask::Redraw));
        assert_eq!(drain_events(&mut fx.consumer), vec![UiEvent::VolumeDisplay(0.6)]);
    }

    #[test]
    fn test_small_change_is_skipped() {
        let mut fx = Fixture::new();
        fx.update(Some(4.0), false, false);
        fx.scheduler.cancel_all();

        let update = fx.update(Some(4.5), false, false);
        assert!(matches!(update, VolumeUpdate::Unchanged { redraw_scheduled: false, .. }));
        assert_eq!(fx.engine.volume_history().len(), 1);
        assert!(!fx.scheduler.is_pending(ScheduledTask::Redraw));
    }

    #[test]
    fn test_force_update_reapplies_same_gain() {
        let mut fx = Fixture::new();
        fx.update(Some(4.0), false, false);
        let update = fx.update(Some(4.0), true, false);
        assert!(update.is_applied());
        assert_eq!(fx.engine.volume_history().len(), 2);
    }

    #[test]
    fn test_custom_fade_scenario() {
        let mut fx = Fixture::new();
        fx.store.set_volume(0.8).unwrap();
        fx.store.set_fade_in_duration(3.0).unwrap();
        fx.store.set_profile(VolumeProfile::Custom(crate::volume::CustomGains::flat(1.0)));

        let gain = fx.update(Some(3.5), false, false).gain().unwrap();
        assert!((gain - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_dragging_suppresses_redraw_not_gain() {
        let mut fx = Fixture::new();
        fx.store.set_profile(VolumeProfile::FadeOut);
        fx.update(Some(2.0), false, false);
        fx.scheduler.cancel_all();

        fx.store.transition(InteractionMode::Dragging).unwrap();
        let update = fx.update(Some(6.0), false, false);
        assert_eq!(
            update,
            VolumeUpdate::Applied {
                gain: 0.5,
                redraw_scheduled: false
            }
        );
        assert!(!fx.scheduler.is_pending(ScheduledTask::Redraw));

        // An explicit redraw request still goes through
        let update = fx.update(Some(6.0), false, true);
        assert!(update.redraw_scheduled());
    }

    #[test]
    fn test_redraw_request_supersedes_pending_one() {
        let mut fx = Fixture::new();
        fx.store.set_profile(VolumeProfile::FadeOut);
        fx.update(Some(2.0), false, false);
        fx.clock.advance_ms(10);
        fx.update(Some(6.0), false, false);

        // First deadline (16ms) passes; the rescheduled one is at 26ms
        fx.clock.advance_ms(7);
        assert!(fx.scheduler.poll().is_empty());
        fx.clock.advance_ms(10);
        assert_eq!(fx.scheduler.poll(), vec![ScheduledTask::Redraw]);
    }

    #[test]
    fn test_position_falls_back_to_synchronizer() {
        let mut fx = Fixture::new();
        fx.store.set_profile(VolumeProfile::FadeOut);
        fx.synchronizer.reset_position(6.0);

        let gain = fx.update(None, false, false).gain().unwrap();
        assert!((gain - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_position_uses_engine_time_while_playing() {
        let mut fx = Fixture::new();
        fx.store.set_profile(VolumeProfile::FadeOut);
        fx.synchronizer.reset_position(2.0);
        fx.engine.seek_to(0.1).unwrap();
        fx.engine.play().unwrap();

        // Engine at 6.0s, synchronizer still at 2.0s
        let gain = fx.update(None, false, false).gain().unwrap();
        assert!((gain - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_inputs_abort() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.update(Some(f64::NAN), false, false),
            VolumeUpdate::Aborted(VolumeAbort::InvalidPosition)
        );

        fx.store.clear_region();
        assert_eq!(
            fx.update(Some(1.0), false, false),
            VolumeUpdate::Aborted(VolumeAbort::NoRegion)
        );
        assert!(fx.engine.volume_history().is_empty());
    }

    #[test]
    fn test_engine_failure_keeps_previous_gain() {
        let mut fx = Fixture::new();
        fx.engine.fail_volume_changes(1);
        assert_eq!(
            fx.update(Some(4.0), false, false),
            VolumeUpdate::Aborted(VolumeAbort::EngineFailed)
        );
        assert_eq!(fx.controller.last_gain(), None);

        assert!(fx.update(Some(4.0), false, false).is_applied());
    }

    #[test]
    fn test_change_speed_direct() {
        let mut engine = SimulatedEngine::new(30.0);
        VolumeController::change_speed(&mut engine, 1.5).unwrap();
        assert_eq!(engine.playback_rate(), 1.5);
    }

    #[test]
    fn test_change_speed_fallback_sequence() {
        let mut engine = SimulatedEngine::new(30.0);
        engine.seek_to(0.5).unwrap();
        engine.play().unwrap();
        engine.fail_rate_changes(1);

        VolumeController::change_speed(&mut engine, 2.0).unwrap();
        assert_eq!(engine.playback_rate(), 2.0);
        assert!(engine.is_playing());
        assert_eq!(engine.seek_history().last().copied(), Some(15.0));
    }

    #[test]
    fn test_change_speed_gives_up_after_fallback() {
        let mut engine = SimulatedEngine::new(30.0);
        engine.play().unwrap();
        engine.fail_rate_changes(2);

        assert!(VolumeController::change_speed(&mut engine, 2.0).is_err());
        assert_eq!(engine.playback_rate(), 1.0);
        assert!(engine.is_playing());
    }
}
