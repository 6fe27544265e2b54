//! # Novade Render Surface
//!
//! Client-side window surfaces rendered through the compositor's
//! presentation channel.
//!
//! A [`Surface`] owns a small [`SwapChain`] of channel buffers and a
//! [`BufferObjectCache`](novade_buffer_cache::BufferObjectCache) of their
//! local imports. The [`AcquireSubmitController`] ties the two together:
//! every frame it acquires a buffer, resolves it to an imported object for the
//! renderer and, on present, submits it back to the channel.
//!
//! ## Modules
//!
//! - [`channel`]: traits for the presentation channel and the native window.
//! - [`swapchain`]: the buffer pool and its slot state machine.
//! - [`controller`]: the acquire/submit protocol.
//! - [`surface`]: the composition root exposed to the rendering API.
//! - [`config`]: TOML configuration and the buffer-count override.
//! - [`logging`]: `tracing` subscriber setup.
//! - [`error`]: error types.

pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
mod test_support;

pub use channel::{BufferUsage, ChannelBuffer, NativeWindow, PresentMode, PresentationChannel};
pub use config::{ConfigLoader, LoggingConfig, SurfaceConfig};
pub use controller::{AcquireSubmitController, BackBuffer};
pub use error::{ConfigError, Result, SurfaceError, SwapChainError};
pub use surface::{BackBufferInfo, Surface};
pub use swapchain::{
    AcquiredBuffer, Completion, SlotState, SwapChain, DEFAULT_BUFFERS, MAX_BUFFERS, MIN_BUFFERS,
};
