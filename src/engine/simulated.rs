// SimulatedEngine - Headless, deterministic playback engine
// Used by the preview binary and the test suites; time only moves on `advance`

use crate::engine::{EngineError, EngineResult, PlaybackEngine};
use crate::region::Region;

/// In-memory player with injectable failures
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    duration: f64,
    time: f64,
    playing: bool,
    rate: f64,
    volume: f32,
    region: Option<Region>,
    loop_region: bool,
    region_events: Vec<Region>,
    volume_history: Vec<f32>,
    seek_history: Vec<f64>,
    failing_rate_changes: usize,
    failing_volume_changes: usize,
    region_locked: bool,
}

impl SimulatedEngine {
    /// Create an engine with a loaded file of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            time: 0.0,
            playing: false,
            rate: 1.0,
            volume: 1.0,
            region: None,
            loop_region: false,
            region_events: Vec::new(),
            volume_history: Vec::new(),
            seek_history: Vec::new(),
            failing_rate_changes: 0,
            failing_volume_changes: 0,
            region_locked: false,
        }
    }

    /// Advance the playhead by `seconds` of wall time (scaled by the rate)
    ///
    /// Stops at the end of the region, or wraps to its start when looping.
    /// Returns the new playhead position.
    pub fn advance(&mut self, seconds: f64) -> f64 {
        if !self.playing || !seconds.is_finite() || seconds <= 0.0 {
            return self.time;
        }

        let mut next = self.time + seconds * self.rate;
        let (start, end) = match self.region {
            Some(region) => (region.start(), region.end()),
            None => (0.0, self.duration),
        };

        if next >= end {
            if self.loop_region && end > start {
                let overflow = next - end;
                next = start + overflow % (end - start);
            } else {
                next = end;
                self.playing = false;
            }
        }

        self.time = next;
        self.time
    }

    /// Simulate the user dragging the region inside the player widget
    pub fn drag_region(&mut self, start: f64, end: f64) {
        if let Ok(region) = Region::try_new(start, end) {
            self.region = Some(region);
            self.region_events.push(region);
        }
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_region = enabled;
    }

    /// Make the next `count` rate changes fail
    pub fn fail_rate_changes(&mut self, count: usize) {
        self.failing_rate_changes = count;
    }

    /// Make the next `count` volume changes fail
    pub fn fail_volume_changes(&mut self, count: usize) {
        self.failing_volume_changes = count;
    }

    /// While locked, `set_region` is refused
    pub fn lock_region(&mut self, locked: bool) {
        self.region_locked = locked;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    /// Every gain successfully applied, in order
    pub fn volume_history(&self) -> &[f32] {
        &self.volume_history
    }

    /// Every seek target in seconds, in order
    pub fn seek_history(&self) -> &[f64] {
        &self.seek_history
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) -> EngineResult<()> {
        if self.duration <= 0.0 {
            return Err(EngineError::NotReady("no audio loaded".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.playing = false;
        Ok(())
    }

    fn seek_to(&mut self, ratio: f64) -> EngineResult<()> {
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(EngineError::InvalidArgument {
                operation: "seek",
                value: ratio,
            });
        }
        self.time = ratio * self.duration;
        self.seek_history.push(self.time);
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
        if self.failing_rate_changes > 0 {
            self.failing_rate_changes -= 1;
            return Err(EngineError::Rejected {
                operation: "set_playback_rate",
                reason: "rate change refused while streaming".into(),
            });
        }
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EngineError::InvalidArgument {
                operation: "set_playback_rate",
                value: rate,
            });
        }
        self.rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, gain: f32) -> EngineResult<()> {
        if self.failing_volume_changes > 0 {
            self.failing_volume_changes -= 1;
            return Err(EngineError::Rejected {
                operation: "set_volume",
                reason: "output node unavailable".into(),
            });
        }
        if !gain.is_finite() {
            return Err(EngineError::InvalidArgument {
                operation: "set_volume",
                value: gain as f64,
            });
        }
        self.volume = gain;
        self.volume_history.push(gain);
        Ok(())
    }

    fn region(&self) -> Option<Region> {
        self.region
    }

    fn set_region(&mut self, start: f64, end: f64) -> EngineResult<()> {
        if self.region_locked {
            return Err(EngineError::Rejected {
                operation: "set_region",
                reason: "region locked".into(),
            });
        }
        let region = Region::try_new(start, end).map_err(|_| EngineError::InvalidArgument {
            operation: "set_region",
            value: end - start,
        })?;
        self.region = Some(region);
        self.region_events.push(region);
        Ok(())
    }

    fn take_region_events(&mut self) -> Vec<Region> {
        std::mem::take(&mut self.region_events)
    }
}
