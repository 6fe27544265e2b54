//! Loading and validation of [`SurfaceConfig`].
//!
//! A configuration is produced in three steps:
//!
//! 1. Parse TOML, from a string or a file. A missing file yields the defaults.
//! 2. Apply environment overrides. `NOVADE_EGL_CLIENT_BUFFERS` replaces the
//!    swap-chain depth.
//! 3. Validate. An out-of-range buffer count is not an error; it falls back to
//!    the default depth with a warning. Log level and format are normalized to
//!    lowercase and rejected if unknown.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::SurfaceConfig;
use crate::error::ConfigError;
use crate::swapchain::{DEFAULT_BUFFERS, MAX_BUFFERS, MIN_BUFFERS};

/// Environment variable overriding [`SurfaceConfig::buffer_count`].
pub const BUFFER_COUNT_ENV: &str = "NOVADE_EGL_CLIENT_BUFFERS";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Namespace for the configuration loading functions.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration from `path` (or the defaults when `None`),
    /// applies environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<SurfaceConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => SurfaceConfig::default(),
        };
        Self::apply_env_overrides(&mut config);
        Self::validate(&mut config)?;
        Ok(config)
    }

    /// Parses a TOML document. Missing fields take their default values.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<SurfaceConfig, ConfigError> {
        if content.trim().is_empty() {
            return Ok(SurfaceConfig::default());
        }
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// A file that does not exist is not an error; the defaults are returned.
    pub fn from_path(path: &Path) -> Result<SurfaceConfig, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_str(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No surface configuration file, using defaults");
                Ok(SurfaceConfig::default())
            }
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Applies [`BUFFER_COUNT_ENV`] if it is set.
    pub fn apply_env_overrides(config: &mut SurfaceConfig) {
        let value = env::var(BUFFER_COUNT_ENV).ok();
        Self::apply_buffer_override(config, value.as_deref());
    }

    /// Applies a raw buffer-count override. Values that do not parse or lie
    /// outside `MIN_BUFFERS..=MAX_BUFFERS` select the default depth.
    pub fn apply_buffer_override(config: &mut SurfaceConfig, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        config.buffer_count = match raw.trim().parse::<usize>() {
            Ok(count) => Self::sanitize_buffer_count(count),
            Err(_) => {
                warn!(
                    value = raw,
                    default = DEFAULT_BUFFERS,
                    "{BUFFER_COUNT_ENV} is not a number, using default"
                );
                DEFAULT_BUFFERS
            }
        };
    }

    /// Clamps a buffer count to the supported range by falling back to the
    /// default depth.
    pub fn sanitize_buffer_count(count: usize) -> usize {
        if (MIN_BUFFERS..=MAX_BUFFERS).contains(&count) {
            count
        } else {
            warn!(
                count,
                default = DEFAULT_BUFFERS,
                "Buffer count outside {MIN_BUFFERS}..={MAX_BUFFERS}, using default"
            );
            DEFAULT_BUFFERS
        }
    }

    /// Normalizes and checks a loaded configuration.
    pub fn validate(config: &mut SurfaceConfig) -> Result<(), ConfigError> {
        config.buffer_count = Self::sanitize_buffer_count(config.buffer_count);

        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                config.logging.level
            )));
        }
        config.logging.level = level;

        let format = config.logging.format.to_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format: '{}'. Must be one of text, json.",
                config.logging.format
            )));
        }
        config.logging.format = format;

        if config.acquire_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "acquire_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
