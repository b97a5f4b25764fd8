// Render job - Parameter bundle submitted to the offline rendering backend
//
// The backend bakes the same region, fades and volume curve the preview
// plays. This module only guarantees the bundle is internally consistent.

use crate::region::{Region, WaveformStore};
use crate::volume::{CustomGains, FadeParameters, VolumeProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Render error types
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No region selected")]
    NoRegion,

    #[error("Invalid render parameter {field}: {value}")]
    InvalidParameter { field: &'static str, value: f64 },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Container/codec the backend should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Aac,
    Ogg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Wav => "wav",
            OutputFormat::Aac => "aac",
            OutputFormat::Ogg => "ogg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "m4a" => Ok(OutputFormat::M4a),
            "wav" => Ok(OutputFormat::Wav),
            "aac" => Ok(OutputFormat::Aac),
            "ogg" => Ok(OutputFormat::Ogg),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Job description sent to the render backend (camelCase JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub start: f64,
    pub end: f64,
    /// Length of the region in seconds
    pub duration: f64,
    pub volume: f32,
    pub volume_profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_volume: Option<CustomGains>,
    /// True if either fade is enabled
    pub fade: bool,
    pub fade_in: bool,
    pub fade_out: bool,
    pub fade_in_duration: f64,
    pub fade_out_duration: f64,
    pub speed: f64,
    pub output_format: OutputFormat,
}

impl RenderJob {
    /// Build a job from the live editor state
    pub fn from_store(store: &WaveformStore, output_format: OutputFormat) -> RenderResult<Self> {
        let region = store.region_bounds().ok_or(RenderError::NoRegion)?;
        Self::build(
            region,
            store.volume(),
            &store.profile(),
            store.fade(),
            store.speed(),
            output_format,
        )
    }

    pub fn build(
        region: Region,
        volume: f32,
        profile: &VolumeProfile,
        fade: FadeParameters,
        speed: f64,
        output_format: OutputFormat,
    ) -> RenderResult<Self> {
        if !volume.is_finite() {
            return Err(RenderError::InvalidParameter {
                field: "volume",
                value: volume as f64,
            });
        }
        if !speed.is_finite() || speed <= 0.0 {
            return Err(RenderError::InvalidParameter {
                field: "speed",
                value: speed,
            });
        }

        let duration = region.duration();
        let job = Self {
            job_id: Uuid::new_v4(),
            created_at: Utc::now(),
            start: region.start(),
            end: region.end(),
            duration,
            volume: volume.clamp(0.0, 1.0),
            volume_profile: profile.name().to_string(),
            custom_volume: profile.custom_gains().map(|gains| gains.clamped()),
            fade: fade.any_enabled(),
            fade_in: fade.fade_in_enabled,
            fade_out: fade.fade_out_enabled,
            fade_in_duration: fade.clipped_fade_in(duration),
            fade_out_duration: fade.clipped_fade_out(duration),
            speed,
            output_format,
        };

        log::debug!(
            "Render job {} built: {:.3}..{:.3}s, profile {}, format {}",
            job.job_id,
            job.start,
            job.end,
            job.volume_profile,
            job.output_format
        );
        Ok(job)
    }

    /// Suggested download file name
    pub fn file_name(&self, stem: &str) -> String {
        let stem = if stem.trim().is_empty() { "audio" } else { stem.trim() };
        format!("{}_cut.{}", stem, self.output_format.extension())
    }

    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(source: &str) -> RenderResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Profile recovered from the name/custom fields
    pub fn profile(&self) -> VolumeProfile {
        VolumeProfile::from_name(&self.volume_profile, self.custom_volume)
    }
}
