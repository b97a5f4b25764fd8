// Fade envelope - Time-windowed linear ramps at the region edges

use serde::{Deserialize, Serialize};

const DEFAULT_FADE_SECS: f64 = 3.0;

/// Fade settings chosen by the user
///
/// Durations are absolute seconds and independent of the region length;
/// `clipped_fade_in`/`clipped_fade_out` bring them back inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeParameters {
    pub fade_in_enabled: bool,
    pub fade_out_enabled: bool,
    pub fade_in_duration: f64,
    pub fade_out_duration: f64,
}

impl Default for FadeParameters {
    fn default() -> Self {
        Self {
            fade_in_enabled: false,
            fade_out_enabled: false,
            fade_in_duration: DEFAULT_FADE_SECS,
            fade_out_duration: DEFAULT_FADE_SECS,
        }
    }
}

impl FadeParameters {
    pub fn new(fade_in_duration: f64, fade_out_duration: f64) -> Self {
        Self {
            fade_in_duration,
            fade_out_duration,
            ..Self::default()
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.fade_in_enabled || self.fade_out_enabled
    }

    /// Fade-in length limited to the region duration
    pub fn clipped_fade_in(&self, region_duration: f64) -> f64 {
        clip_duration(self.fade_in_duration, region_duration)
    }

    /// Fade-out length limited to the region duration
    pub fn clipped_fade_out(&self, region_duration: f64) -> f64 {
        clip_duration(self.fade_out_duration, region_duration)
    }
}

/// A fade duration is usable if it is finite and strictly positive
pub fn is_valid_fade_duration(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}

fn clip_duration(duration: f64, region_duration: f64) -> f64 {
    if !is_valid_fade_duration(duration) {
        return 0.0;
    }
    if region_duration.is_finite() && region_duration > 0.0 {
        duration.min(region_duration)
    } else {
        duration
    }
}

/// Multiplicative fade envelope at a relative position inside the region
///
/// `elapsed = relative * region_duration`, `remaining = region_duration - elapsed`.
/// Inside the fade-in window the gain is `elapsed / fade_in`, inside the
/// fade-out window `remaining / fade_out`; both clamp to [0, 1] and multiply.
/// A `None` or non-positive duration disables that side. A non-positive
/// region duration disables the envelope entirely (returns 1.0).
pub fn fade_envelope(
    relative_position: f64,
    region_duration: f64,
    fade_in: Option<f64>,
    fade_out: Option<f64>,
) -> f32 {
    if !region_duration.is_finite() || region_duration <= 0.0 {
        return 1.0;
    }

    let elapsed = relative_position * region_duration;
    let remaining = region_duration - elapsed;
    let mut multiplier = 1.0_f64;

    if let Some(fade_in) = fade_in.map(|d| clip_duration(d, region_duration))
        && fade_in > 0.0
        && elapsed < fade_in
    {
        multiplier *= (elapsed / fade_in).clamp(0.0, 1.0);
    }

    if let Some(fade_out) = fade_out.map(|d| clip_duration(d, region_duration))
        && fade_out > 0.0
        && remaining < fade_out
    {
        multiplier *= (remaining / fade_out).clamp(0.0, 1.0);
    }

    multiplier as f32
}
