// Editor configuration - tunables persisted as RON
//
// HISTORY_DEDUP_TOLERANCE and REGION_SIGNIFICANCE_THRESHOLD must stay separate:
// the first suppresses exact duplicate snapshots, the second decides whether the
// user actually moved the region.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tolerance under which two history snapshots are considered identical
pub const HISTORY_DEDUP_TOLERANCE: f64 = 1e-7;

/// Smallest region change (seconds) treated as a real edit rather than engine noise
pub const REGION_SIGNIFICANCE_THRESHOLD: f64 = 0.001;

/// Smallest gain delta worth sending to the playback engine
pub const GAIN_CHANGE_EPSILON: f32 = 0.001;

/// Lowest gain the fade-in profile starts from
pub const FADE_IN_FLOOR: f32 = 0.02;

/// Gain used when the calculator produces a non-finite value
pub const GAIN_FALLBACK: f32 = 1.0;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 16;
pub const DEFAULT_REDRAW_INTERVAL_MS: u64 = 16;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 50;
pub const DEFAULT_PARAM_DEBOUNCE_MS: u64 = 30;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

const CONFIG_DIR_NAME: &str = "mymusic_cutter";
const CONFIG_FILE_NAME: &str = "editor.ron";

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime tunables for the region/volume engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo entries kept
    pub history_limit: usize,
    /// Minimum spacing between two applied position syncs (~60 Hz)
    pub sync_interval_ms: u64,
    /// Delay before a requested waveform redraw fires
    pub redraw_interval_ms: u64,
    /// How long an interaction mode stays active after its trigger
    pub settle_delay_ms: u64,
    /// Debounce for slider-driven parameter changes
    pub param_debounce_ms: u64,
    /// Capacity of the UI event ring buffer
    pub event_capacity: usize,
    pub min_speed: f64,
    pub max_speed: f64,
    pub default_fade_in_secs: f64,
    pub default_fade_out_secs: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            redraw_interval_ms: DEFAULT_REDRAW_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            param_debounce_ms: DEFAULT_PARAM_DEBOUNCE_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            min_speed: 0.25,
            max_speed: 4.0,
            default_fade_in_secs: 3.0,
            default_fade_out_secs: 3.0,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a RON document. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let config: EditorConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> ConfigResult<String> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Load the config at `path`, or the defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No editor config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Per-user config location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be at least 1".to_string(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be at least 1".to_string(),
            ));
        }

        if !self.min_speed.is_finite()
            || !self.max_speed.is_finite()
            || self.min_speed <= 0.0
            || self.min_speed >= self.max_speed
        {
            return Err(ConfigError::Invalid(format!(
                "speed range [{}, {}] is not a valid positive interval",
                self.min_speed, self.max_speed
            )));
        }

        for (name, value) in [
            ("default_fade_in_secs", self.default_fade_in_secs),
            ("default_fade_out_secs", self.default_fade_out_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn param_debounce(&self) -> Duration {
        Duration::from_millis(self.param_debounce_ms)
    }

    /// Clamp a playback rate into the configured range
    pub fn clamp_speed(&self, rate: f64) -> f64 {
        if rate.is_finite() {
            rate.clamp(self.min_speed, self.max_speed)
        } else {
            1.0
        }
    }
}
