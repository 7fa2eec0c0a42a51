use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LoopError, Result};
use crate::time_unit::TimeUnit;

/// Section of the configuration file holding the loop settings
pub const SETTINGS_SECTION: &str = "event_loop";

const ENV_PREFIX: &str = "TICKLOOP";

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> std::result::Result<Config, ConfigError> {
    load_config(path.as_ref(), FileFormat::Toml)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> std::result::Result<Config, ConfigError> {
    load_config(path.as_ref(), FileFormat::Yaml)
}

// Environment overrides use a double underscore between keys, e.g.
// TICKLOOP_EVENT_LOOP__TICK_INTERVAL=250ms
fn load_config(path: &Path, format: FileFormat) -> std::result::Result<Config, ConfigError> {
    Config::builder()
        .add_source(File::from(path).format(format))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
}

/// Settings for one event loop.
///
/// ```toml
/// [event_loop]
/// tick_interval = "100ms"
/// submission_capacity = 2000
/// max_concurrent_handlers = 0
///
/// [event_loop.logging]
/// enabled = true
/// file_path = "logs/tickloop.log"
/// include_info = false
/// max_bytes = 10485760
/// max_backups = 5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Tick interval: shorthand ("250ms", "1s") or bare milliseconds.
    pub tick_interval: String,
    /// Capacity of the bounded submission channel.
    pub submission_capacity: usize,
    /// Cap on concurrently running handlers; 0 means unbounded.
    pub max_concurrent_handlers: usize,
    pub logging: LogSettings,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_interval: "100ms".to_string(),
            submission_capacity: 2000,
            max_concurrent_handlers: 0,
            logging: LogSettings::default(),
        }
    }
}

impl LoopSettings {
    /// Read the `[event_loop]` section; a missing section yields defaults.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.get::<LoopSettings>(SETTINGS_SECTION) {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parsed, non-zero tick interval.
    pub fn tick_interval(&self) -> Result<Duration> {
        match TimeUnit::parse_interval(&self.tick_interval) {
            Some(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(LoopError::InvalidSetting {
                key: "tick_interval",
                value: self.tick_interval.clone(),
            }),
        }
    }
}

/// Size at which the log file is rotated (10 MiB).
pub const DEFAULT_MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated files kept next to the live log (`.1` through `.5`).
pub const DEFAULT_MAX_LOG_BACKUPS: usize = 5;

/// Logging configuration for the loop's dedicated sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub enabled: bool,
    /// Destination file; stderr when unset.
    pub file_path: Option<PathBuf>,
    /// Include informational records. Errors are always written when enabled.
    pub include_info: bool,
    /// Rotate the file once the next record would exceed this many bytes.
    pub max_bytes: u64,
    pub max_backups: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            file_path: None,
            include_info: false,
            max_bytes: DEFAULT_MAX_LOG_BYTES,
            max_backups: DEFAULT_MAX_LOG_BACKUPS,
        }
    }
}
