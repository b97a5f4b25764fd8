// UI events - What the presentation layer needs to refresh

/// Notification for the UI layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    /// Gain applied to the engine, for the volume readout
    VolumeDisplay(f32),
    /// Playhead position in seconds, for the time readout
    TimeDisplay(f64),
    RegionChanged { start: f64, end: f64 },
    /// Repaint the waveform and volume overlay
    RedrawRequested,
    HistoryChanged { can_undo: bool, can_redo: bool },
}
