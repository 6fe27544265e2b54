//! Error handling for render surfaces.
//!
//! Three error types are defined here using `thiserror`:
//!
//! - [`SwapChainError`] for the buffer pool and its acquire/submit state machine.
//! - [`ConfigError`] for loading and validating [`crate::config::SurfaceConfig`].
//! - [`SurfaceError`], the error returned by [`crate::Surface`] operations. It
//!   wraps the other two as well as [`CacheError`] from the import cache.
//!
//! Ownership-tracking corruption (a completion for a buffer that was never
//! submitted) is not represented here. It panics at the point of detection.

use std::path::PathBuf;
use std::time::Duration;

use novade_buffer_cache::{CacheError, ExternalHandle};
use thiserror::Error;

/// Errors raised by [`crate::SwapChain`].
#[derive(Debug, Error)]
pub enum SwapChainError {
    /// The requested pool depth is not within `2..=4`.
    #[error("Invalid buffer count {0}, expected 2..=4")]
    InvalidBufferCount(usize),

    /// The presentation channel could not produce a buffer.
    /// At creation time this aborts the whole swap chain.
    #[error("Presentation channel failed to allocate buffer #{index} ({width}x{height})")]
    AllocationFailed { index: usize, width: u32, height: u32 },

    /// The swap chain has been shut down and hands out no more buffers.
    #[error("Swap chain is shut down")]
    Closed,

    /// Every buffer is acquired and none is in flight, so no completion can
    /// ever make one available again.
    #[error("All buffers are acquired and none are in flight")]
    Exhausted,

    /// The configured acquire deadline passed without a buffer coming back.
    #[error("Timed out after {0:?} waiting for the presentation channel to return a buffer")]
    AcquireTimeout(Duration),

    /// No acquired buffer carries this handle.
    #[error("No acquired buffer matches {0}")]
    NotAcquired(ExternalHandle),
}

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while attempting to read a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value parsed fine but is not acceptable.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Errors returned by [`crate::Surface`] and the acquire/submit controller.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The native window handed in at creation is not usable.
    #[error("Native window is not valid")]
    BadNativeWindow,

    /// The native window has no usable presentation chain.
    #[error("Native window has no valid presentation chain")]
    BadPresentationChain,

    /// The requested native visual has no supported pixel format.
    #[error("Unsupported pixel format (visual id {0})")]
    UnsupportedFormat(u32),

    /// Only swap intervals 0 (mailbox) and 1 (fifo) are supported.
    #[error("Unsupported swap interval {0}, only 0 and 1 are supported")]
    BadSwapInterval(i32),

    /// Pixmap surfaces cannot be backed by a presentation chain.
    #[error("Pixmap surfaces are not supported")]
    PixmapUnsupported,

    /// The surface has already been destroyed.
    #[error("Surface has been destroyed")]
    Destroyed,

    #[error("Swap chain error: {0}")]
    SwapChain(#[from] SwapChainError),

    #[error("Buffer cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A specialized `Result` type for surface operations.
pub type Result<T> = std::result::Result<T, SurfaceError>;
