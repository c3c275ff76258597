//! Configuration for the Binclock binaries and engine.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BINCLOCK_*` environment variables. Command-line flags are applied on top
//! by the binaries themselves.

use crate::registry::DEFAULT_CAPACITY;
use crate::render::DisplayMode;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Name of the config file looked up in the working directory when no path
/// is given (`binclock.toml`).
pub const DEFAULT_CONFIG_NAME: &str = "binclock";

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "BINCLOCK";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BinclockConfig {
    /// Display format used by the CLI.
    pub display: DisplayMode,

    /// Keep redrawing instead of printing once.
    pub run_loop: bool,

    /// Time between redraws in loop mode.
    pub interval_ms: u64,

    /// Maximum number of simultaneously registered displays.
    pub capacity: usize,

    /// Clear the terminal before each redraw (ignored for JSON output).
    pub clear_screen: bool,

    /// Tracing filter directive, e.g. `info` or `binclock=debug`.
    pub log_level: String,
}

impl Default for BinclockConfig {
    fn default() -> Self {
        Self {
            display: DisplayMode::Emoji,
            run_loop: false,
            interval_ms: 1000,
            capacity: DEFAULT_CAPACITY,
            clear_screen: true,
            log_level: "warn".to_string(),
        }
    }
}

impl BinclockConfig {
    /// Loads settings from `path` (required) or from `binclock.toml` in the
    /// working directory (optional), then from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layered(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: Self = Config::builder()
            .add_source(file)
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Message(
                "interval_ms must be at least 1".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Message(
                "capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Whether loop mode should clear the screen between frames.
    pub fn clears_screen(&self) -> bool {
        self.clear_screen && self.display != DisplayMode::Json
    }
}
