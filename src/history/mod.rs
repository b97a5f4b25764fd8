// Region history - Undo/redo of region boundary edits
//
// Snapshots are recorded *before* the live region is mutated, so popping the
// undo stack always yields the bounds the user saw prior to the edit.

pub mod snapshot;
pub mod stack;

pub use snapshot::{RegionSnapshot, SnapshotSource};
pub use stack::{HistoryError, HistoryResult, RegionHistory, RegionTarget};
