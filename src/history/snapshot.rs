// History entries

use crate::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of action produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Manual,
    Drag,
    Click,
    Keyboard,
    Reset,
    /// Region-updated notification echoed back by the playback engine
    Engine,
    /// Current region saved onto the redo stack by an undo
    UndoSave,
    /// Current region saved onto the undo stack by a redo
    RedoSave,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapshotSource::Manual => "manual",
            SnapshotSource::Drag => "drag",
            SnapshotSource::Click => "click",
            SnapshotSource::Keyboard => "keyboard",
            SnapshotSource::Reset => "reset",
            SnapshotSource::Engine => "engine",
            SnapshotSource::UndoSave => "undo_save",
            SnapshotSource::RedoSave => "redo_save",
        };
        f.write_str(name)
    }
}

/// Immutable copy of the region bounds at a point in time
///
/// Bounds are stored at full precision; undo must restore them bit for bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    start: f64,
    end: f64,
    timestamp: DateTime<Utc>,
    source: SnapshotSource,
}

impl RegionSnapshot {
    pub fn new(start: f64, end: f64, source: SnapshotSource) -> Self {
        Self {
            start,
            end,
            timestamp: Utc::now(),
            source,
        }
    }

    pub fn from_region(region: &Region, source: SnapshotSource) -> Self {
        Self::new(region.start(), region.end(), source)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> SnapshotSource {
        self.source
    }

    /// Both edges within `tolerance` of the given bounds
    pub fn matches(&self, start: f64, end: f64, tolerance: f64) -> bool {
        (self.start - start).abs() < tolerance && (self.end - end).abs() < tolerance
    }
}
