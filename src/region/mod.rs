// Region module - The selected [start, end) span of the loaded audio
//
// The canonical bounds live in `WaveformStore`; everything else holds copies.

pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{InteractionMode, RegionUpdate, StoreError, StoreResult, WaveformStore};

/// Region error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    #[error("Invalid region bounds: start={start}, end={end}")]
    InvalidBounds { start: f64, end: f64 },
}

/// Selected region in seconds. Always `end > start >= 0`, both finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    start: f64,
    end: f64,
}

/// Check the region invariant without building a `Region`
pub fn is_valid_bounds(start: f64, end: f64) -> bool {
    start.is_finite() && end.is_finite() && start >= 0.0 && end > start
}

impl Region {
    pub fn try_new(start: f64, end: f64) -> Result<Self, RegionError> {
        if is_valid_bounds(start, end) {
            Ok(Self { start, end })
        } else {
            Err(RegionError::InvalidBounds { start, end })
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Position normalized to [0, 1] inside the region
    pub fn relative_position(&self, position: f64) -> f64 {
        ((position - self.start) / self.duration()).clamp(0.0, 1.0)
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }

    /// True if either edge moved by at least `threshold` seconds
    pub fn differs_from(&self, other: &Region, threshold: f64) -> bool {
        (self.start - other.start).abs() >= threshold || (self.end - other.end).abs() >= threshold
    }
}
