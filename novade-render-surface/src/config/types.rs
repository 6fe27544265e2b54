//! Configuration schema.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults;

/// Settings for one render surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Depth of the swap chain, `2..=4`.
    #[serde(default = "defaults::default_buffer_count")]
    pub buffer_count: usize,

    /// Upper bound for a blocked acquire, in milliseconds.
    #[serde(default = "defaults::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: Option<u64>,

    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

impl SurfaceConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        defaults::default_surface_config()
    }
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "defaults::default_log_level")]
    pub level: String,

    /// `text` or `json`.
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}
