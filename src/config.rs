//! Configuration types for the ambient host.

use crate::error::{MeiLinError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeiLinConfig {
    /// Ambient behavior settings.
    pub ambient: AmbientConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Ambient behavior engine and idle loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    /// Master switch for spontaneous behaviors.
    pub enabled: bool,
    /// Behavior pack JSON. The built-in MeiLin pack is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_path: Option<PathBuf>,
    /// Starting personality mode. Overrides the pack's `settings.default_mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<String>,
    /// Chance (`0.0..=1.0`) that a due check actually produces a behavior.
    pub trigger_probability: f64,
    /// Seconds between idle loop ticks.
    pub tick_interval_secs: u64,
    /// Idle ticks between ambient checks.
    ///
    /// With the defaults (10 s ticks, every 6th tick) MeiLin considers an
    /// ambient behavior about once a minute of silence.
    pub check_every_ticks: u32,
    /// Directory with pre-generated idle response audio. Overrides the pack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<PathBuf>,
    /// Directory with ambient clip audio. Overrides the pack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_directory: Option<PathBuf>,
    /// Fixed RNG seed for reproducible sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pack_path: None,
            default_mode: None,
            trigger_probability: 0.3,
            tick_interval_secs: 10,
            check_every_ticks: 6,
            cache_directory: None,
            clip_directory: None,
            seed: None,
        }
    }
}

impl AmbientConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Also write daily-rotated log files.
    pub file: bool,
    /// Where rotated logs go. Setting it implies `file`; defaults to
    /// [`logs_dir`](crate::meilin_dirs::logs_dir).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "meilin=info,meilin_ambient=info".to_owned(),
            file: false,
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Directory for rotated log files, or `None` when file logging is off.
    pub fn file_directory(&self) -> Option<PathBuf> {
        match &self.directory {
            Some(dir) => Some(dir.clone()),
            None if self.file => Some(crate::meilin_dirs::logs_dir()),
            None => None,
        }
    }
}

impl MeiLinConfig {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`MeiLinError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let p = self.ambient.trigger_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(MeiLinError::Config(format!(
                "ambient.trigger_probability must be within 0.0..=1.0, got {p}"
            )));
        }
        if self.ambient.tick_interval_secs == 0 {
            return Err(MeiLinError::Config(
                "ambient.tick_interval_secs must be greater than 0".into(),
            ));
        }
        if self.ambient.check_every_ticks == 0 {
            return Err(MeiLinError::Config(
                "ambient.check_every_ticks must be greater than 0".into(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(MeiLinError::Config("logging.filter must not be empty".into()));
        }
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| MeiLinError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file) for whichever file is read.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Self::default_config_path();
        if default_path.is_file() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MeiLinError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path, `~/.config/meilin/config.toml` on Linux.
    pub fn default_config_path() -> PathBuf {
        crate::meilin_dirs::config_file()
    }
}
