// Playback engine - The waveform player the editor drives
//
// The real player (decoding, output, waveform rendering) lives outside this
// crate. The editor only talks to it through `PlaybackEngine`.

pub mod simulated;

use crate::region::Region;

pub use simulated::SimulatedEngine;

/// Engine error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Playback engine not ready: {0}")]
    NotReady(String),

    #[error("Playback engine rejected {operation}: {reason}")]
    Rejected { operation: &'static str, reason: String },

    #[error("Invalid argument for {operation}: {value}")]
    InvalidArgument { operation: &'static str, value: f64 },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Imperative API of the waveform player
///
/// Time values are seconds; `seek_to` takes a ratio of the total duration.
pub trait PlaybackEngine {
    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_playing(&self) -> bool;

    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    /// Seek to `ratio` (0.0..=1.0) of the total duration
    fn seek_to(&mut self, ratio: f64) -> EngineResult<()>;

    fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()>;

    fn set_volume(&mut self, gain: f32) -> EngineResult<()>;

    /// Region as currently shown by the player
    fn region(&self) -> Option<Region>;

    /// Move the player's region; the player reports it back as a region event
    fn set_region(&mut self, start: f64, end: f64) -> EngineResult<()>;

    /// Drain "region updated" notifications fired since the last call
    fn take_region_events(&mut self) -> Vec<Region>;
}
