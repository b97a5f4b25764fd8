// Shared cells - Lock-free f64/f32 values readable from any consumer
// Stores the float bits in an atomic integer so readers never block

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Playback position in seconds, shared by reference
///
/// Cloning is cheap and every clone observes the same value.
#[derive(Debug, Clone)]
pub struct SharedPosition {
    inner: Arc<AtomicU64>,
}

impl SharedPosition {
    pub fn new(seconds: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(seconds.to_bits())),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.inner.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }

    /// True if both handles point at the same cell
    pub fn same_cell(&self, other: &SharedPosition) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for SharedPosition {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Gain value shared between the controller and display consumers
#[derive(Debug, Clone)]
pub struct SharedGain {
    inner: Arc<AtomicU32>,
}

impl SharedGain {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for SharedGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}
