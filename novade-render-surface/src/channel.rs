//! Contract with the compositor's presentation channel and the native window.
//!
//! The channel is an opaque asynchronous service: it allocates buffers, takes
//! submitted buffers for display and hands each one back exactly once through
//! a [`Completion`], possibly from another thread.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use novade_buffer_cache::{ExternalHandle, PixelFormat};

pub use crate::swapchain::Completion;

bitflags! {
    /// Intended use of an allocated buffer, matching the GBM usage bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The buffer may be scanned out directly by the display engine.
        const SCANOUT = 1 << 0;
        /// The buffer may be used as a render target.
        const RENDERING = 1 << 2;
    }
}

/// How the channel paces submitted buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Newest buffer replaces any queued one (swap interval 0).
    Mailbox,
    /// Buffers are shown in submission order, one per refresh (swap interval 1).
    Fifo,
}

impl PresentMode {
    /// Maps a swap interval onto a present mode. Any interval other than 0 or
    /// 1 is unsupported.
    pub fn from_swap_interval(interval: i32) -> Option<Self> {
        match interval {
            0 => Some(Self::Mailbox),
            1 => Some(Self::Fifo),
            _ => None,
        }
    }
}

/// One buffer instance owned by the presentation channel.
///
/// Equality is identity: two values compare equal when they refer to the same
/// channel buffer.
pub trait ChannelBuffer: Clone + PartialEq + Send + fmt::Debug + 'static {
    /// The handle the buffer can be imported with.
    fn external_handle(&self) -> ExternalHandle;
    /// Channel-supplied recency signal. `0` means the contents are new or were
    /// invalidated since the buffer was last seen.
    fn reported_age(&self) -> u32;
    /// Row pitch in bytes.
    fn stride(&self) -> u32;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// The compositor's producer/consumer presentation channel.
pub trait PresentationChannel: Send + Sync {
    type Buffer: ChannelBuffer;

    /// Allocates a buffer, blocking until the compositor answers. `None`
    /// signals resource exhaustion.
    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        usage: BufferUsage,
    ) -> Option<Self::Buffer>;

    /// Queues `buffer` for display. The channel must call
    /// [`Completion::complete`] exactly once when it hands the buffer back.
    fn submit(&self, buffer: Self::Buffer, completion: Completion<Self::Buffer>);

    /// Gives up a buffer that is not currently submitted.
    fn release(&self, buffer: Self::Buffer);

    fn set_present_mode(&self, mode: PresentMode);
}

/// The window a surface renders into.
pub trait NativeWindow {
    type Channel: PresentationChannel;

    fn is_valid(&self) -> bool;

    /// Current size of the window in pixels. Buffers that do not match it are
    /// reallocated on acquire.
    fn size(&self) -> (u32, u32);

    /// The presentation chain backing this window, if it has a valid one.
    fn presentation_chain(&self) -> Option<Arc<Self::Channel>>;
}

impl<W: NativeWindow> NativeWindow for Arc<W> {
    type Channel = W::Channel;

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn presentation_chain(&self) -> Option<Arc<Self::Channel>> {
        (**self).presentation_chain()
    }
}
