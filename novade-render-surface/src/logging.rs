//! Logging setup for applications embedding render surfaces.
//!
//! The crate itself only emits `tracing` events. These helpers install a
//! global subscriber for binaries and tests that do not bring their own.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Installs a stderr subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

fn parse_level(level: &str) -> Result<Level, ConfigError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::ValidationError(format!(
            "Invalid log level in config: {level}"
        ))),
    }
}

fn stderr_layer(format: &str, filter: EnvFilter) -> Result<Box<dyn Layer<Registry> + Send + Sync>, ConfigError> {
    match format.to_lowercase().as_str() {
        "json" => Ok(fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(filter)
            .boxed()),
        "text" => Ok(fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .with_filter(filter)
            .boxed()),
        other => Err(ConfigError::ValidationError(format!(
            "Invalid log format in config: {other}"
        ))),
    }
}

/// Installs a stderr subscriber as described by `config`.
///
/// # Errors
/// [`ConfigError::ValidationError`] for an unknown level or format. A global
/// subscriber that is already installed is left in place and is not an error.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = parse_level(&config.level)?;
    let layer = stderr_layer(&config.format, EnvFilter::new(level.to_string()))?;

    if let Err(e) = Registry::default().with(layer).try_init() {
        tracing::debug!(error = %e, "Global subscriber already installed, keeping it");
    }
    Ok(())
}
