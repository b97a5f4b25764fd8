// Sync module - Keeps the current playback position consistent across its homes
//
// Homes: the engine-reported time, the UI display state and the shared
// position cells read synchronously by the rest of the editor.

pub mod position;
pub mod shared;

pub use position::{
    PositionSynchronizer, SyncError, SyncOutcome, SyncResult, SyncSource, SyncTargets,
    TargetError,
};
pub use shared::{SharedGain, SharedPosition};
