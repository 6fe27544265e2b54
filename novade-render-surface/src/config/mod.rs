//! Configuration for render surfaces.
//!
//! - [`types`] holds the schema, [`SurfaceConfig`] and [`LoggingConfig`].
//! - [`defaults`] provides the values used for missing fields.
//! - [`loader`] reads TOML, applies the `NOVADE_EGL_CLIENT_BUFFERS` override
//!   and validates the result through [`ConfigLoader`].
//!
//! ```rust,ignore
//! use novade_render_surface::config::ConfigLoader;
//!
//! let config = ConfigLoader::load(Some(Path::new("/etc/novade/surface.toml")))?;
//! assert!((2..=4).contains(&config.buffer_count));
//! ```

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, BUFFER_COUNT_ENV};
pub use types::{LoggingConfig, SurfaceConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_surface_config_default() {
        let config = SurfaceConfig::default();
        assert_eq!(config.buffer_count, 3);
        assert_eq!(config.acquire_timeout_ms, None);
        assert_eq!(config.acquire_timeout(), None);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
    }

    #[test]
    fn test_acquire_timeout_conversion() {
        let config = SurfaceConfig {
            acquire_timeout_ms: Some(250),
            ..SurfaceConfig::default()
        };
        assert_eq!(config.acquire_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_serialize_roundtrip_through_toml() {
        let config = SurfaceConfig {
            buffer_count: 2,
            acquire_timeout_ms: Some(16),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "json".to_string(),
            },
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: SurfaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
