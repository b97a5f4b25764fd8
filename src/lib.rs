// MyMusic Cutter - Library exports for tests and benchmarks

pub mod config;
pub mod engine;
pub mod history;
pub mod messaging;
pub mod orchestrator;
pub mod region;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod sync;
pub mod timing;
pub mod volume;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EditorConfig};
pub use engine::{EngineError, PlaybackEngine, SimulatedEngine};
pub use history::{HistoryError, RegionHistory, RegionSnapshot, RegionTarget, SnapshotSource};
pub use messaging::{EventConsumer, UiEvent, drain_events};
pub use orchestrator::{VolumeAbort, VolumeController, VolumeUpdate};
pub use region::{InteractionMode, Region, RegionUpdate, WaveformStore};
pub use render::{OutputFormat, RenderJob};
pub use scheduler::{FrameScheduler, ScheduledTask};
pub use session::{EditorSession, RegionEdge, SessionError};
pub use sync::{PositionSynchronizer, SyncOutcome, SyncSource, SyncTargets};
pub use timing::{Clock, ManualClock, SystemClock};
pub use volume::{CustomGains, FadeParameters, GainParams, VolumeProfile, compute_gain};
