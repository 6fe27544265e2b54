//! Default configuration values.
//!
//! Referenced from `#[serde(default = ...)]` attributes so that a partial or
//! empty configuration file still yields a complete [`SurfaceConfig`].

use crate::config::{LoggingConfig, SurfaceConfig};
use crate::swapchain::DEFAULT_BUFFERS;

pub(super) fn default_surface_config() -> SurfaceConfig {
    SurfaceConfig {
        buffer_count: default_buffer_count(),
        acquire_timeout_ms: default_acquire_timeout_ms(),
        logging: default_logging_config(),
    }
}

/// Triple buffering.
pub(super) fn default_buffer_count() -> usize {
    DEFAULT_BUFFERS
}

/// `None`: acquire blocks until the presentation channel returns a buffer.
pub(super) fn default_acquire_timeout_ms() -> Option<u64> {
    None
}

pub(super) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        format: default_log_format(),
    }
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_log_format() -> String {
    "text".to_string()
}
