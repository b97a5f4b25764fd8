// Volume profiles - Gain as a pure function of the position inside the region

use crate::config::{FADE_IN_FLOOR, GAIN_FALLBACK};
use crate::volume::fade::{FadeParameters, fade_envelope};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Control points of the custom profile, each in [0, 1]
///
/// Placed at relative positions 0.0, 0.5 and 1.0 and linearly interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomGains {
    pub start: f32,
    pub middle: f32,
    pub end: f32,
}

impl CustomGains {
    pub fn new(start: f32, middle: f32, end: f32) -> Self {
        Self {
            start: clamp_gain(start),
            middle: clamp_gain(middle),
            end: clamp_gain(end),
        }
    }

    pub fn flat(gain: f32) -> Self {
        Self::new(gain, gain, gain)
    }

    /// Same points forced back into [0, 1]; NaN becomes 0
    pub fn clamped(&self) -> Self {
        Self::new(self.start, self.middle, self.end)
    }

    /// Piecewise-linear interpolation through the three control points
    pub fn at(&self, x: f64) -> f64 {
        let points = self.clamped();
        let (start, middle, end) = (
            points.start as f64,
            points.middle as f64,
            points.end as f64,
        );
        if x <= 0.5 {
            start + (middle - start) * (x / 0.5)
        } else {
            middle + (end - middle) * ((x - 0.5) / 0.5)
        }
    }
}

impl Default for CustomGains {
    fn default() -> Self {
        Self::flat(1.0)
    }
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) }
}

/// Shape of the volume envelope over the region
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum VolumeProfile {
    #[default]
    #[serde(rename = "uniform")]
    Uniform,
    #[serde(rename = "fadeIn")]
    FadeIn,
    #[serde(rename = "fadeOut")]
    FadeOut,
    #[serde(rename = "custom")]
    Custom(CustomGains),
    #[serde(rename = "bell")]
    Bell,
    #[serde(rename = "valley")]
    Valley,
    #[serde(rename = "exponential_in")]
    ExponentialIn,
    #[serde(rename = "exponential_out")]
    ExponentialOut,
}

impl VolumeProfile {
    /// Parse a profile name as used by the render backend.
    ///
    /// `custom` uses the supplied control points (flat 1.0 if none).
    /// Unknown names fall back to `Uniform`.
    pub fn from_name(name: &str, custom: Option<CustomGains>) -> Self {
        match name {
            "uniform" => VolumeProfile::Uniform,
            "fadeIn" => VolumeProfile::FadeIn,
            "fadeOut" => VolumeProfile::FadeOut,
            "custom" => VolumeProfile::Custom(custom.unwrap_or_default().clamped()),
            "bell" => VolumeProfile::Bell,
            "valley" => VolumeProfile::Valley,
            "exponential_in" => VolumeProfile::ExponentialIn,
            "exponential_out" => VolumeProfile::ExponentialOut,
            other => {
                log::warn!("Unknown volume profile '{}', using uniform", other);
                VolumeProfile::Uniform
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VolumeProfile::Uniform => "uniform",
            VolumeProfile::FadeIn => "fadeIn",
            VolumeProfile::FadeOut => "fadeOut",
            VolumeProfile::Custom(_) => "custom",
            VolumeProfile::Bell => "bell",
            VolumeProfile::Valley => "valley",
            VolumeProfile::ExponentialIn => "exponential_in",
            VolumeProfile::ExponentialOut => "exponential_out",
        }
    }

    pub fn custom_gains(&self) -> Option<CustomGains> {
        match self {
            VolumeProfile::Custom(gains) => Some(*gains),
            _ => None,
        }
    }

    /// Base shape at relative position `x` in [0, 1], before fades
    fn base_gain(&self, x: f64, intended_volume: f64) -> f64 {
        let floor = FADE_IN_FLOOR as f64;
        match self {
            VolumeProfile::Uniform => intended_volume,
            VolumeProfile::FadeIn => {
                let ramp = floor + (intended_volume - floor) * x;
                ramp.max(floor).min(intended_volume.max(floor))
            }
            VolumeProfile::FadeOut => intended_volume * (1.0 - x),
            VolumeProfile::Custom(gains) => gains.at(x) * intended_volume,
            // bell/valley ignore intended_volume, unlike every other shape
            VolumeProfile::Bell => (PI * x).sin(),
            VolumeProfile::Valley => 1.0 - (PI * x).sin(),
            VolumeProfile::ExponentialIn => x * x,
            VolumeProfile::ExponentialOut => (1.0 - x) * (1.0 - x),
        }
    }
}

impl fmt::Display for VolumeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs to `compute_gain` besides the position and the profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainParams {
    /// Master volume chosen by the user, in [0, 1]
    pub intended_volume: f32,
    pub fade: FadeParameters,
    /// Region length in seconds
    pub region_duration: f64,
}

impl GainParams {
    pub fn new(intended_volume: f32, fade: FadeParameters, region_duration: f64) -> Self {
        Self {
            intended_volume,
            fade,
            region_duration,
        }
    }
}

/// Compute the preview gain at `relative_position` inside the region
///
/// - NaN/infinite positions are treated as 0, out-of-range ones are clamped.
/// - `Custom` always composes with the duration-based fade envelope; every
///   other profile only when the matching fade flag is set.
/// - The result is clamped to [0, 1]. A non-finite result yields
///   `GAIN_FALLBACK` so NaN never reaches the audio engine.
pub fn compute_gain(relative_position: f64, profile: &VolumeProfile, params: &GainParams) -> f32 {
    let x = if relative_position.is_finite() {
        relative_position.clamp(0.0, 1.0)
    } else {
        log::warn!(
            "Non-finite relative position {} in gain calculation, using 0",
            relative_position
        );
        0.0
    };

    let base = profile.base_gain(x, params.intended_volume as f64);

    let fade = &params.fade;
    let envelope = match profile {
        VolumeProfile::Custom(_) => fade_envelope(
            x,
            params.region_duration,
            Some(fade.fade_in_duration),
            Some(fade.fade_out_duration),
        ),
        _ => fade_envelope(
            x,
            params.region_duration,
            fade.fade_in_enabled.then_some(fade.fade_in_duration),
            fade.fade_out_enabled.then_some(fade.fade_out_duration),
        ),
    };

    let gain = base * envelope as f64;
    if !gain.is_finite() {
        log::error!(
            "Gain calculation produced {} (profile {}, position {}), falling back to {}",
            gain,
            profile,
            x,
            GAIN_FALLBACK
        );
        return GAIN_FALLBACK;
    }

    gain.clamp(0.0, 1.0) as f32
}
