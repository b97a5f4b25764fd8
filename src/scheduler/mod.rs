// Frame scheduler - One debounce/throttle utility for every deferred action
//
// Each task kind has at most one pending deadline. Scheduling a task that is
// already pending replaces it (cancel-previous-then-schedule-new), so rapid
// slider ticks or position updates never pile up timers.
// The host calls `poll()` once per animation frame.

use crate::timing::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Deferred work the editor knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScheduledTask {
    /// Repaint the waveform/volume overlay
    Redraw,
    /// Recompute and re-apply the gain, ignoring the change epsilon
    ForceVolumeUpdate,
    /// Return the store's interaction mode to idle
    SettleInteraction,
}

pub struct FrameScheduler {
    clock: Arc<dyn Clock>,
    pending: HashMap<ScheduledTask, Duration>,
}

impl FrameScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: HashMap::new(),
        }
    }

    /// Debounce: run `task` after `delay`, replacing any pending deadline
    ///
    /// Returns true if a pending run was superseded.
    pub fn schedule(&mut self, task: ScheduledTask, delay: Duration) -> bool {
        let deadline = self.clock.now() + delay;
        self.pending.insert(task, deadline).is_some()
    }

    /// Throttle: run `task` after `delay` unless it is already pending
    ///
    /// Returns true if a new deadline was set.
    pub fn throttle(&mut self, task: ScheduledTask, delay: Duration) -> bool {
        if self.pending.contains_key(&task) {
            return false;
        }
        self.schedule(task, delay);
        true
    }

    pub fn cancel(&mut self, task: ScheduledTask) -> bool {
        self.pending.remove(&task).is_some()
    }

    /// Drop everything (component teardown)
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, task: ScheduledTask) -> bool {
        self.pending.contains_key(&task)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().min().copied()
    }

    /// Remove and return every task whose deadline has passed, earliest first
    pub fn poll(&mut self) -> Vec<ScheduledTask> {
        let now = self.clock.now();
        let mut due: Vec<(Duration, ScheduledTask)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(task, deadline)| (*deadline, *task))
            .collect();
        due.sort();

        for (_, task) in &due {
            self.pending.remove(task);
        }

        due.into_iter().map(|(_, task)| task).collect()
    }
}
