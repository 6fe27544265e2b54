//! Acquire/submit protocol tying the swap chain to the import cache.
//!
//! Acquiring a frame asks the swap chain for a buffer, resolves its external
//! handle to an imported object through the cache and records the result as
//! the back buffer. Submitting hands the back buffer to the presentation
//! channel and immediately acquires the target for the next frame.

use novade_buffer_cache::{BufferImporter, BufferObjectCache, ExternalHandle, ImportDescriptor};
use tracing::{debug, trace, warn};

use crate::channel::{ChannelBuffer, PresentationChannel};
use crate::error::Result;
use crate::swapchain::SwapChain;

/// The buffer the renderer is currently drawing into.
///
/// `cache_slot` is a non-owning index into the import cache; the cache owns
/// the imported object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackBuffer {
    pub cache_slot: usize,
    pub handle: ExternalHandle,
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes.
    pub stride: u32,
    /// Age reported by the channel when the buffer was acquired.
    pub buffer_age: u32,
}

/// Drives one surface's swap chain and import cache.
///
/// Callers serialize access; the cache has no locking of its own.
pub struct AcquireSubmitController<C: PresentationChannel, I: BufferImporter> {
    swap_chain: SwapChain<C>,
    cache: BufferObjectCache<I>,
    back: Option<BackBuffer>,
    /// The back buffer is acquired and not yet submitted.
    pending: bool,
}

impl<C: PresentationChannel, I: BufferImporter> AcquireSubmitController<C, I> {
    pub fn new(swap_chain: SwapChain<C>, cache: BufferObjectCache<I>) -> Self {
        Self {
            swap_chain,
            cache,
            back: None,
            pending: false,
        }
    }

    /// Prepares the back buffer for the next frame.
    ///
    /// If a back buffer is already acquired and not yet submitted it is
    /// returned unchanged, so at most one buffer is ever acquired per surface.
    ///
    /// A cached import is reused unless the channel reports age `0` for the
    /// buffer, which means the handle was recycled with new contents and the
    /// entry is re-imported in place. An unknown handle is imported into the
    /// slot picked by the cache's eviction policy. Either way the cache ages
    /// are advanced with the chosen slot as the used one.
    pub fn acquire(&mut self, target: (u32, u32)) -> Result<BackBuffer> {
        if let (true, Some(back)) = (self.pending, self.back) {
            return Ok(back);
        }

        // The previous back buffer is submitted or gone; never expose it again.
        let previous_slot = self.back.take().map(|back| back.cache_slot);
        self.pending = false;

        let acquired = self.swap_chain.acquire(target)?;
        let buffer = acquired.buffer;
        let handle = buffer.external_handle();
        let buffer_age = buffer.reported_age();
        let descriptor = ImportDescriptor {
            handle,
            width: buffer.width(),
            height: buffer.height(),
            stride: buffer.stride(),
            format: self.swap_chain.format(),
        };

        let cache_slot = match self.resolve(&descriptor, buffer_age, previous_slot) {
            Ok(slot) => slot,
            Err(err) => {
                warn!(%handle, error = %err, "Could not import acquired buffer, returning it");
                if let Err(cancel_err) = self.swap_chain.cancel(handle) {
                    warn!(%handle, error = %cancel_err, "Could not return acquired buffer");
                }
                return Err(err);
            }
        };
        self.cache.update_ages(cache_slot);

        let back = BackBuffer {
            cache_slot,
            handle,
            width: descriptor.width,
            height: descriptor.height,
            stride: descriptor.stride,
            buffer_age,
        };
        debug!(
            swap_slot = acquired.slot,
            cache_slot,
            %handle,
            buffer_age,
            "Back buffer ready"
        );
        self.back = Some(back);
        self.pending = true;
        Ok(back)
    }

    fn resolve(
        &mut self,
        descriptor: &ImportDescriptor,
        buffer_age: u32,
        previous_slot: Option<usize>,
    ) -> Result<usize> {
        match self.cache.lookup(descriptor.handle) {
            Some(slot) => {
                if buffer_age == 0 {
                    debug!(slot, handle = %descriptor.handle, "Buffer contents invalidated, re-importing");
                    self.cache.insert_or_refresh(slot, descriptor)?;
                } else {
                    trace!(slot, handle = %descriptor.handle, "Reusing cached buffer object");
                }
                Ok(slot)
            }
            None => {
                let slot = self.cache.select_eviction_slot(previous_slot);
                self.cache.insert_or_refresh(slot, descriptor)?;
                Ok(slot)
            }
        }
    }

    /// Presents the back buffer and acquires the next one.
    ///
    /// Submission and the following acquire form one present operation; the
    /// returned value is the new back buffer.
    pub fn submit(&mut self, target: (u32, u32)) -> Result<BackBuffer> {
        if let (true, Some(back)) = (self.pending, self.back) {
            self.swap_chain.submit(back.handle)?;
            self.pending = false;
        }
        self.acquire(target)
    }

    /// Current back buffer, if one has been acquired.
    pub fn back_buffer(&self) -> Option<&BackBuffer> {
        self.back.as_ref()
    }

    /// Imported object of the current back buffer.
    pub fn back_object(&self) -> Option<&I::Object> {
        self.back
            .and_then(|back| self.cache.object(back.cache_slot))
    }

    /// Age the channel reported for the current back buffer, `0` without one.
    pub fn buffer_age(&self) -> u32 {
        self.back.map_or(0, |back| back.buffer_age)
    }

    pub fn swap_chain(&self) -> &SwapChain<C> {
        &self.swap_chain
    }

    pub fn cache(&self) -> &BufferObjectCache<I> {
        &self.cache
    }

    /// Drops every import, gives the pending back buffer back and shuts the
    /// swap chain down, waiting for in-flight buffers.
    pub fn teardown(&mut self) {
        self.cache.clear();
        if let (true, Some(back)) = (self.pending, self.back) {
            if let Err(err) = self.swap_chain.cancel(back.handle) {
                warn!(handle = %back.handle, error = %err, "Back buffer was not acquired at teardown");
            }
        }
        self.back = None;
        self.pending = false;
        self.swap_chain.shutdown();
    }
}
