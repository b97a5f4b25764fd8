// RegionHistory - Manages undo/redo stacks of region snapshots

use crate::config::{DEFAULT_HISTORY_LIMIT, HISTORY_DEDUP_TOLERANCE};
use crate::history::snapshot::{RegionSnapshot, SnapshotSource};
use crate::region::{Region, is_valid_bounds};
use std::collections::VecDeque;

/// History error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Current region is not readable from the playback engine")]
    NoCurrentRegion,

    #[error("Region setter rejected bounds start={start}, end={end}")]
    ApplyFailed { start: f64, end: f64 },
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Where undo/redo read the live region from and write the restored one to
pub trait RegionTarget {
    /// Region as currently applied in the playback engine
    fn current_region(&self) -> Option<Region>;

    /// Apply new bounds; `false` means nothing was changed
    fn apply_region(&mut self, start: f64, end: f64) -> bool;
}

/// Bounded undo/redo history of region bounds
///
/// The manager maintains two stacks:
/// - Undo stack: regions as they were before each recorded edit
/// - Redo stack: regions replaced by an undo
///
/// Recording a new edit clears the redo stack. Once the undo stack holds
/// `max_history` entries the oldest one is evicted.
#[derive(Debug, Clone)]
pub struct RegionHistory {
    /// Most recent at the back
    undo_stack: VecDeque<RegionSnapshot>,

    /// Most recent at the back
    redo_stack: VecDeque<RegionSnapshot>,

    max_history: usize,
}

impl RegionHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_capacity(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Record the region as it stands *before* an edit
    ///
    /// Must be called before the live region is mutated. Returns `false`
    /// when the bounds are invalid or equal (within 1e-7) to the newest undo
    /// entry; in both cases the stacks are left untouched.
    pub fn record_before_change(&mut self, start: f64, end: f64, source: SnapshotSource) -> bool {
        if !is_valid_bounds(start, end) {
            log::warn!(
                "Not recording invalid region start={} end={} ({})",
                start,
                end,
                source
            );
            return false;
        }

        if let Some(top) = self.undo_stack.back()
            && top.matches(start, end, HISTORY_DEDUP_TOLERANCE)
        {
            log::trace!("Skipping duplicate history entry from {}", source);
            return false;
        }

        self.undo_stack
            .push_back(RegionSnapshot::new(start, end, source));

        // New edit, new timeline
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }

        true
    }

    /// Restore the region saved by the most recent edit
    ///
    /// The current region is saved on the redo stack first. If the target
    /// refuses the restored bounds, both stacks are put back exactly as they
    /// were.
    pub fn undo(&mut self, target: &mut dyn RegionTarget) -> HistoryResult<Region> {
        if self.undo_stack.is_empty() {
            return Err(HistoryError::NothingToUndo);
        }
        let current = target
            .current_region()
            .ok_or(HistoryError::NoCurrentRegion)?;

        let snapshot = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;
        self.redo_stack
            .push_back(RegionSnapshot::from_region(&current, SnapshotSource::UndoSave));

        if !target.apply_region(snapshot.start(), snapshot.end()) {
            self.redo_stack.pop_back();
            let (start, end) = (snapshot.start(), snapshot.end());
            self.undo_stack.push_back(snapshot);
            log::error!(
                "Undo failed to apply region {}..{}, history rolled back",
                start,
                end
            );
            return Err(HistoryError::ApplyFailed { start, end });
        }

        while self.redo_stack.len() > self.max_history {
            self.redo_stack.pop_front();
        }

        Region::try_new(snapshot.start(), snapshot.end())
            .map_err(|_| HistoryError::ApplyFailed {
                start: snapshot.start(),
                end: snapshot.end(),
            })
    }

    /// Re-apply the region replaced by the most recent undo
    pub fn redo(&mut self, target: &mut dyn RegionTarget) -> HistoryResult<Region> {
        if self.redo_stack.is_empty() {
            return Err(HistoryError::NothingToRedo);
        }
        let current = target
            .current_region()
            .ok_or(HistoryError::NoCurrentRegion)?;

        let snapshot = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;
        self.undo_stack
            .push_back(RegionSnapshot::from_region(&current, SnapshotSource::RedoSave));

        if !target.apply_region(snapshot.start(), snapshot.end()) {
            self.undo_stack.pop_back();
            let (start, end) = (snapshot.start(), snapshot.end());
            self.redo_stack.push_back(snapshot);
            log::error!(
                "Redo failed to apply region {}..{}, history rolled back",
                start,
                end
            );
            return Err(HistoryError::ApplyFailed { start, end });
        }

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }

        Region::try_new(snapshot.start(), snapshot.end())
            .map_err(|_| HistoryError::ApplyFailed {
                start: snapshot.start(),
                end: snapshot.end(),
            })
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Snapshot an undo would restore
    pub fn peek_undo(&self) -> Option<&RegionSnapshot> {
        self.undo_stack.back()
    }

    /// Snapshot a redo would restore
    pub fn peek_redo(&self) -> Option<&RegionSnapshot> {
        self.redo_stack.back()
    }

    /// Undo entries, oldest first
    pub fn undo_entries(&self) -> impl Iterator<Item = &RegionSnapshot> {
        self.undo_stack.iter()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

impl Default for RegionHistory {
    fn default() -> Self {
        Self::new()
    }
}
