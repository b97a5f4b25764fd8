// Position synchronizer - Single-writer, rate-limited fan-out of the playhead
//
// A sync that arrives while another is in flight is dropped, not queued:
// writing a target may fire a listener that calls back into `sync`.

use crate::sync::shared::SharedPosition;
use crate::timing::Clock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

const NEVER_SYNCED: u64 = u64::MAX;

/// Who asked for the position update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncSource {
    /// Periodic position report from the playback engine
    Tick,
    Seek,
    Drag,
    Click,
    Keyboard,
    Programmatic,
    /// Bypasses the rate limit
    Force,
}

impl SyncSource {
    pub fn is_force(&self) -> bool {
        matches!(self, SyncSource::Force)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SyncSource::Tick => "tick",
            SyncSource::Seek => "seek",
            SyncSource::Drag => "drag",
            SyncSource::Click => "click",
            SyncSource::Keyboard => "keyboard",
            SyncSource::Programmatic => "programmatic",
            SyncSource::Force => "force",
        }
    }
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised by a single sync target
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct TargetError(pub String);

impl TargetError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Sync error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Position target '{target}' failed: {source}")]
    TargetFailed {
        target: String,
        #[source]
        source: TargetError,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;

/// What happened to a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// All targets were written
    Applied,
    /// Another sync held the gate
    Busy,
    /// Too soon after the previous applied sync
    RateLimited,
    /// Position was NaN or infinite
    Rejected,
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SyncOutcome::Applied)
    }
}

pub type PositionSetter<'a> = Box<dyn FnMut(f64) -> Result<(), TargetError> + 'a>;

/// The places a new position has to land, in write order:
/// refs first, then UI setters, then the external callback.
#[derive(Default)]
pub struct SyncTargets<'a> {
    refs: Vec<&'a SharedPosition>,
    setters: Vec<(&'static str, PositionSetter<'a>)>,
    callback: Option<PositionSetter<'a>>,
}

impl<'a> SyncTargets<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ref(mut self, cell: &'a SharedPosition) -> Self {
        self.refs.push(cell);
        self
    }

    pub fn with_setter(
        mut self,
        name: &'static str,
        setter: impl FnMut(f64) -> Result<(), TargetError> + 'a,
    ) -> Self {
        self.setters.push((name, Box::new(setter)));
        self
    }

    pub fn with_callback(
        mut self,
        callback: impl FnMut(f64) -> Result<(), TargetError> + 'a,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Releases the gate when dropped, including on early return
struct GateGuard<'a> {
    gate: &'a AtomicBool,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.store(false, Ordering::Release);
    }
}

/// Mutual-exclusion gate plus ~60 Hz rate limit in front of the position targets
pub struct PositionSynchronizer {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    in_progress: AtomicBool,
    last_applied_micros: AtomicU64,
    last_position: SharedPosition,
}

impl PositionSynchronizer {
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            in_progress: AtomicBool::new(false),
            last_applied_micros: AtomicU64::new(NEVER_SYNCED),
            last_position: SharedPosition::default(),
        }
    }

    /// Fan `position` out to every target
    ///
    /// Dropped calls return `Ok` with a non-applied outcome. `Err` means a
    /// target failed part-way; the gate is released either way.
    pub fn sync(
        &self,
        position: f64,
        source: SyncSource,
        targets: SyncTargets<'_>,
    ) -> SyncResult<SyncOutcome> {
        if !position.is_finite() {
            log::warn!("Ignoring non-finite position {} from {}", position, source);
            return Ok(SyncOutcome::Rejected);
        }

        if self
            .in_progress
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            log::trace!("Position sync from {} dropped: gate held", source);
            return Ok(SyncOutcome::Busy);
        }
        let _guard = GateGuard {
            gate: &self.in_progress,
        };

        let now = self.clock.now().as_micros() as u64;
        if !source.is_force() && self.too_soon(now) {
            log::trace!("Position sync from {} dropped: rate limited", source);
            return Ok(SyncOutcome::RateLimited);
        }

        self.last_applied_micros.store(now, Ordering::Relaxed);
        self.last_position.set(position);

        let SyncTargets {
            refs,
            setters,
            callback,
        } = targets;

        for cell in refs {
            cell.set(position);
        }

        for (name, mut setter) in setters {
            setter(position).map_err(|source| SyncError::TargetFailed {
                target: name.to_string(),
                source,
            })?;
        }

        if let Some(mut callback) = callback {
            callback(position).map_err(|source| SyncError::TargetFailed {
                target: "time_update_callback".to_string(),
                source,
            })?;
        }

        Ok(SyncOutcome::Applied)
    }

    fn too_soon(&self, now_micros: u64) -> bool {
        let last = self.last_applied_micros.load(Ordering::Relaxed);
        last != NEVER_SYNCED
            && now_micros.saturating_sub(last) < self.min_interval.as_micros() as u64
    }

    /// Last position accepted by the gate
    pub fn last_position(&self) -> f64 {
        self.last_position.get()
    }

    /// Seed the last known position without fanning out (e.g. after loading a file)
    pub fn reset_position(&self, position: f64) {
        if position.is_finite() {
            self.last_position.set(position);
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn synchronizer() -> (ManualClock, Arc<PositionSynchronizer>) {
        let clock = ManualClock::new();
        let sync = Arc::new(PositionSynchronizer::new(
            Arc::new(clock.clone()),
            Duration::from_millis(16),
        ));
        (clock, sync)
    }

    #[test]
    fn test_applies_to_all_targets_in_order() {
        let (_clock, sync) = synchronizer();
        let cell = SharedPosition::default();
        let order = RefCell::new(Vec::new());

        let outcome = sync
            .sync(
                4.5,
                SyncSource::Tick,
                SyncTargets::new()
                    .with_ref(&cell)
                    .with_setter("display", |p| {
                        order.borrow_mut().push(("display", p));
                        Ok(())
                    })
                    .with_callback(|p| {
                        order.borrow_mut().push(("callback", p));
                        Ok(())
                    }),
            )
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Applied);
        assert_eq!(cell.get(), 4.5);
        assert_eq!(sync.last_position(), 4.5);
        assert_eq!(*order.borrow(), vec![("display", 4.5), ("callback", 4.5)]);
    }

    #[test]
    fn test_second_tick_within_interval_is_dropped() {
        let (clock, sync) = synchronizer();
        let cell = SharedPosition::default();

        let first = sync
            .sync(1.0, SyncSource::Tick, SyncTargets::new().with_ref(&cell))
            .unwrap();
        clock.advance_ms(10);
        let second = sync
            .sync(2.0, SyncSource::Tick, SyncTargets::new().with_ref(&cell))
            .unwrap();

        assert_eq!(first, SyncOutcome::Applied);
        assert_eq!(second, SyncOutcome::RateLimited);
        assert_eq!(cell.get(), 1.0);

        let forced = sync
            .sync(3.0, SyncSource::Force, SyncTargets::new().with_ref(&cell))
            .unwrap();
        assert_eq!(forced, SyncOutcome::Applied);
        assert_eq!(cell.get(), 3.0);
    }

    #[test]
    fn test_tick_after_interval_applies() {
        let (clock, sync) = synchronizer();
        sync.sync(1.0, SyncSource::Tick, SyncTargets::new()).unwrap();
        clock.advance_ms(16);
        let outcome = sync.sync(1.1, SyncSource::Tick, SyncTargets::new()).unwrap();
        assert!(outcome.is_applied());
    }

    #[test]
    fn test_reentrant_sync_is_dropped() {
        let (_clock, sync) = synchronizer();
        let nested = Rc::new(RefCell::new(None));

        let inner_sync = Arc::clone(&sync);
        let nested_result = Rc::clone(&nested);
        let outcome = sync
            .sync(
                5.0,
                SyncSource::Force,
                SyncTargets::new().with_setter("listener", move |p| {
                    let result = inner_sync.sync(p + 1.0, SyncSource::Force, SyncTargets::new());
                    *nested_result.borrow_mut() = Some(result);
                    Ok(())
                }),
            )
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Applied);
        assert_eq!(*nested.borrow(), Some(Ok(SyncOutcome::Busy)));
        assert_eq!(sync.last_position(), 5.0);
        assert!(!sync.is_syncing());
    }

    #[test]
    fn test_failing_target_releases_gate_and_surfaces_error() {
        let (_clock, sync) = synchronizer();
        let cell = SharedPosition::default();
        let reached_callback = RefCell::new(false);

        let result = sync.sync(
            2.0,
            SyncSource::Force,
            SyncTargets::new()
                .with_ref(&cell)
                .with_setter("display", |_| Err(TargetError::new("display detached")))
                .with_callback(|_| {
                    *reached_callback.borrow_mut() = true;
                    Ok(())
                }),
        );

        assert!(matches!(
            result,
            Err(SyncError::TargetFailed { ref target, .. }) if target == "display"
        ));
        assert_eq!(cell.get(), 2.0);
        assert!(!*reached_callback.borrow());
        assert!(!sync.is_syncing());

        let next = sync.sync(3.0, SyncSource::Force, SyncTargets::new()).unwrap();
        assert!(next.is_applied());
    }

    #[test]
    fn test_non_finite_position_rejected() {
        let (_clock, sync) = synchronizer();
        let cell = SharedPosition::new(1.0);
        let outcome = sync
            .sync(f64::NAN, SyncSource::Force, SyncTargets::new().with_ref(&cell))
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Rejected);
        assert_eq!(cell.get(), 1.0);
    }
}
