// WaveformStore - Single owner of the live region and preview parameters
//
// Every writer (pointer drag, click, keyboard, undo/redo, engine echoes) goes
// through this store. Other components keep read-only copies.

use crate::config::{EditorConfig, REGION_SIGNIFICANCE_THRESHOLD};
use crate::history::{RegionHistory, SnapshotSource};
use crate::region::Region;
use crate::sync::SharedPosition;
use crate::volume::fade::is_valid_fade_duration;
use crate::volume::{CustomGains, FadeParameters, GainParams, VolumeProfile};
use std::fmt;

/// What kind of region change is currently in flight
///
/// Replaces a set of independent "is dragging / is click-updating /
/// is programmatic" flags that could contradict each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// A region edge is being dragged
    Dragging,
    /// An edge was moved by a click and the engine is settling the seek
    ClickSeeking,
    /// Bounds are being pushed into the engine by code (undo, reset, API)
    ProgrammaticUpdate,
}

impl InteractionMode {
    /// Idle can go anywhere, anything can return to Idle, and re-entering
    /// the current mode refreshes it. A programmatic write may also take
    /// over from a settling click. Everything else is refused.
    pub fn can_transition_to(self, next: InteractionMode) -> bool {
        self == InteractionMode::Idle
            || next == InteractionMode::Idle
            || self == next
            || (self == InteractionMode::ClickSeeking && next == InteractionMode::ProgrammaticUpdate)
    }

    /// Region reports from `source` must not create history entries
    /// while this mode is active
    pub fn suppresses_history_for(self, source: SnapshotSource) -> bool {
        match self {
            InteractionMode::Idle => false,
            // The pre-drag snapshot was taken when the drag started
            InteractionMode::Dragging => {
                matches!(source, SnapshotSource::Drag | SnapshotSource::Engine)
            }
            InteractionMode::ClickSeeking => {
                matches!(source, SnapshotSource::Drag | SnapshotSource::Engine)
            }
            InteractionMode::ProgrammaticUpdate => matches!(
                source,
                SnapshotSource::Drag | SnapshotSource::Engine | SnapshotSource::Click
            ),
        }
    }

    /// Redraws are held back while dragging to avoid jitter
    pub fn suppresses_redraw(self) -> bool {
        self == InteractionMode::Dragging
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionMode::Idle => "idle",
            InteractionMode::Dragging => "dragging",
            InteractionMode::ClickSeeking => "click-seeking",
            InteractionMode::ProgrammaticUpdate => "programmatic",
        };
        f.write_str(name)
    }
}

/// Store error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Cannot switch interaction mode from {from} to {to}")]
    InvalidTransition {
        from: InteractionMode,
        to: InteractionMode,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of `update_from_external_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionUpdate {
    /// Bounds were invalid; nothing changed
    Rejected,
    /// Applied, but the change is below the significance threshold
    Noise,
    /// Applied as a real edit
    Applied { recorded: bool },
}

impl RegionUpdate {
    pub fn is_significant(&self) -> bool {
        matches!(self, RegionUpdate::Applied { .. })
    }
}

/// Canonical editor state
#[derive(Debug, Clone)]
pub struct WaveformStore {
    region: Option<Region>,
    volume: f32,
    profile: VolumeProfile,
    fade: FadeParameters,
    speed: f64,
    playing: bool,
    loop_enabled: bool,
    mode: InteractionMode,
    position: SharedPosition,
}

impl WaveformStore {
    pub fn new(fade: FadeParameters) -> Self {
        Self {
            region: None,
            volume: 1.0,
            profile: VolumeProfile::Uniform,
            fade,
            speed: 1.0,
            playing: false,
            loop_enabled: false,
            mode: InteractionMode::Idle,
            position: SharedPosition::default(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(FadeParameters::new(
            config.default_fade_in_secs,
            config.default_fade_out_secs,
        ))
    }

    // --- Region -----------------------------------------------------------

    pub fn region_bounds(&self) -> Option<Region> {
        self.region
    }

    /// Replace the bounds. Invalid input returns `false` and changes nothing.
    pub fn set_region_bounds(&mut self, start: f64, end: f64) -> bool {
        match Region::try_new(start, end) {
            Ok(region) => {
                self.region = Some(region);
                true
            }
            Err(err) => {
                log::warn!("set_region_bounds refused: {}", err);
                false
            }
        }
    }

    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// Entry point for drag, click, keyboard and engine region reports
    ///
    /// Changes below `REGION_SIGNIFICANCE_THRESHOLD` are applied but never
    /// recorded. A significant change is recorded (pre-change bounds first,
    /// then the mutation) when `should_record_history` is set and the
    /// current interaction mode does not suppress history for `source`.
    pub fn update_from_external_event(
        &mut self,
        start: f64,
        end: f64,
        should_record_history: bool,
        source: SnapshotSource,
        history: &mut RegionHistory,
    ) -> RegionUpdate {
        let candidate = match Region::try_new(start, end) {
            Ok(region) => region,
            Err(err) => {
                log::warn!("Region update from {} rejected: {}", source, err);
                return RegionUpdate::Rejected;
            }
        };

        let previous = self.region;
        let significant = previous
            .map(|prev| prev.differs_from(&candidate, REGION_SIGNIFICANCE_THRESHOLD))
            .unwrap_or(true);

        let mut recorded = false;
        if significant
            && should_record_history
            && !self.mode.suppresses_history_for(source)
            && let Some(prev) = previous
        {
            recorded = history.record_before_change(prev.start(), prev.end(), source);
        }

        self.region = Some(candidate);

        if significant {
            RegionUpdate::Applied { recorded }
        } else {
            RegionUpdate::Noise
        }
    }

    // --- Interaction mode -------------------------------------------------

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn transition(&mut self, next: InteractionMode) -> StoreResult<()> {
        if !self.mode.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                from: self.mode,
                to: next,
            });
        }
        if self.mode != next {
            log::debug!("Interaction mode {} -> {}", self.mode, next);
        }
        self.mode = next;
        Ok(())
    }

    pub fn finish_interaction(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        self.mode == InteractionMode::Dragging
    }

    // --- Preview parameters ----------------------------------------------

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamped to [0, 1]; NaN/infinite values are refused
    pub fn set_volume(&mut self, volume: f32) -> StoreResult<()> {
        if !volume.is_finite() {
            return Err(StoreError::InvalidValue {
                field: "volume",
                value: volume as f64,
            });
        }
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn profile(&self) -> VolumeProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: VolumeProfile) {
        self.profile = match profile {
            VolumeProfile::Custom(gains) => VolumeProfile::Custom(gains.clamped()),
            other => other,
        };
    }

    /// Switch to the custom profile with the given control points
    pub fn set_custom_gains(&mut self, gains: CustomGains) {
        self.profile = VolumeProfile::Custom(gains.clamped());
    }

    pub fn fade(&self) -> FadeParameters {
        self.fade
    }

    pub fn set_fade_in_enabled(&mut self, enabled: bool) {
        self.fade.fade_in_enabled = enabled;
    }

    pub fn set_fade_out_enabled(&mut self, enabled: bool) {
        self.fade.fade_out_enabled = enabled;
    }

    pub fn set_fade_in_duration(&mut self, seconds: f64) -> StoreResult<()> {
        if !is_valid_fade_duration(seconds) {
            return Err(StoreError::InvalidValue {
                field: "fade_in_duration",
                value: seconds,
            });
        }
        self.fade.fade_in_duration = seconds;
        Ok(())
    }

    pub fn set_fade_out_duration(&mut self, seconds: f64) -> StoreResult<()> {
        if !is_valid_fade_duration(seconds) {
            return Err(StoreError::InvalidValue {
                field: "fade_out_duration",
                value: seconds,
            });
        }
        self.fade.fade_out_duration = seconds;
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) -> StoreResult<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(StoreError::InvalidValue {
                field: "speed",
                value: speed,
            });
        }
        self.speed = speed;
        Ok(())
    }

    // --- Playback ----------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Shared cell holding the last synchronized playhead position
    pub fn position_cell(&self) -> &SharedPosition {
        &self.position
    }

    pub fn position(&self) -> f64 {
        self.position.get()
    }

    /// Calculator inputs for the current state, if a region is set
    pub fn gain_params(&self) -> Option<GainParams> {
        self.region
            .map(|region| GainParams::new(self.volume, self.fade, region.duration()))
    }
}

impl Default for WaveformStore {
    fn default() -> Self {
        Self::new(FadeParameters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_region(start: f64, end: f64) -> WaveformStore {
        let mut store = WaveformStore::default();
        assert!(store.set_region_bounds(start, end));
        store
    }

    #[test]
    fn test_set_region_bounds_validates() {
        let mut store = store_with_region(1.0, 4.0);

        assert!(!store.set_region_bounds(5.0, 5.0));
        assert!(!store.set_region_bounds(5.0, 3.0));
        assert!(!store.set_region_bounds(f64::NAN, 3.0));
        assert_eq!(store.region_bounds(), Region::try_new(1.0, 4.0).ok());

        assert!(store.set_region_bounds(2.0, 6.0));
        assert_eq!(store.region_bounds().unwrap().end(), 6.0);
    }

    #[test]
    fn test_external_event_records_before_mutating() {
        let mut store = store_with_region(1.0, 4.0);
        let mut history = RegionHistory::new();

        let update =
            store.update_from_external_event(1.5, 4.0, true, SnapshotSource::Drag, &mut history);

        assert_eq!(update, RegionUpdate::Applied { recorded: true });
        let top = history.peek_undo().unwrap();
        assert_eq!((top.start(), top.end()), (1.0, 4.0));
        assert_eq!(store.region_bounds().unwrap().start(), 1.5);
    }

    #[test]
    fn test_external_event_noise_not_recorded() {
        let mut store = store_with_region(1.0, 4.0);
        let mut history = RegionHistory::new();

        let update =
            store.update_from_external_event(1.0004, 4.0, true, SnapshotSource::Engine, &mut history);

        assert_eq!(update, RegionUpdate::Noise);
        assert_eq!(history.undo_count(), 0);
        // Still applied to the live bounds
        assert_eq!(store.region_bounds().unwrap().start(), 1.0004);
    }

    #[test]
    fn test_external_event_invalid_rejected() {
        let mut store = store_with_region(1.0, 4.0);
        let mut history = RegionHistory::new();
        let update =
            store.update_from_external_event(4.0, 1.0, true, SnapshotSource::Drag, &mut history);
        assert_eq!(update, RegionUpdate::Rejected);
        assert_eq!(store.region_bounds(), Region::try_new(1.0, 4.0).ok());
    }

    #[test]
    fn test_click_mode_suppresses_drag_reconciliation_history() {
        let mut store = store_with_region(1.0, 4.0);
        let mut history = RegionHistory::new();

        store.transition(InteractionMode::ClickSeeking).unwrap();
        let click = store.update_from_external_event(1.0, 6.0, true, SnapshotSource::Click, &mut history);
        assert_eq!(click, RegionUpdate::Applied { recorded: true });

        // Drag reconciliation reporting a further adjustment while the click settles
        let drag = store.update_from_external_event(1.0, 6.5, true, SnapshotSource::Drag, &mut history);
        assert_eq!(drag, RegionUpdate::Applied { recorded: false });
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn test_mode_transitions() {
        let mut store = WaveformStore::default();
        store.transition(InteractionMode::Dragging).unwrap();
        assert!(store.is_dragging());
        store.transition(InteractionMode::Dragging).unwrap();

        let err = store.transition(InteractionMode::ClickSeeking).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidTransition {
                from: InteractionMode::Dragging,
                to: InteractionMode::ClickSeeking,
            }
        );
        assert!(store.is_dragging());

        store.finish_interaction();
        assert_eq!(store.mode(), InteractionMode::Idle);
        store.transition(InteractionMode::ProgrammaticUpdate).unwrap();
    }

    #[test]
    fn test_programmatic_write_supersedes_settling_click() {
        let mut store = WaveformStore::default();
        store.transition(InteractionMode::ClickSeeking).unwrap();
        store.transition(InteractionMode::ProgrammaticUpdate).unwrap();
        assert_eq!(store.mode(), InteractionMode::ProgrammaticUpdate);

        // Not the other way round
        assert!(store.transition(InteractionMode::ClickSeeking).is_err());
        assert!(!InteractionMode::Dragging.can_transition_to(InteractionMode::ProgrammaticUpdate));
    }

    #[test]
    fn test_parameter_setters_validate() {
        let mut store = WaveformStore::default();
        store.set_volume(1.7).unwrap();
        assert_eq!(store.volume(), 1.0);
        assert!(store.set_volume(f32::NAN).is_err());

        assert!(store.set_fade_in_duration(0.0).is_err());
        assert!(store.set_fade_out_duration(-2.0).is_err());
        store.set_fade_in_duration(1.5).unwrap();
        assert_eq!(store.fade().fade_in_duration, 1.5);

        assert!(store.set_speed(0.0).is_err());
        store.set_speed(1.25).unwrap();
        assert_eq!(store.speed(), 1.25);
    }

    #[test]
    fn test_custom_gains_switch_profile() {
        let mut store = WaveformStore::default();
        store.set_custom_gains(CustomGains::new(0.2, 0.4, 0.6));
        assert_eq!(store.profile().name(), "custom");
        assert_eq!(store.profile().custom_gains().unwrap().middle, 0.4);
    }

    #[test]
    fn test_gain_params_require_region() {
        let mut store = WaveformStore::default();
        assert!(store.gain_params().is_none());
        store.set_region_bounds(2.0, 10.0);
        assert_eq!(store.gain_params().unwrap().region_duration, 8.0);
    }
}
