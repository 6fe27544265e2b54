//! Fixed pool of presentation-channel buffers cycling through ownership states.
//!
//! Every slot moves `Available -> Acquired -> Submitted -> Available`. The
//! renderer side acquires and submits; the presentation channel hands
//! submitted buffers back through a [`Completion`], possibly from its own
//! thread. Slot states live behind one mutex paired with one condition
//! variable. An acquire that finds every slot busy after a full sweep waits on
//! the condition variable, and every completion wakes all waiters, which then
//! re-scan.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use novade_buffer_cache::{ExternalHandle, PixelFormat};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::channel::{BufferUsage, ChannelBuffer, PresentationChannel};
use crate::error::SwapChainError;

/// Smallest supported pool depth.
pub const MIN_BUFFERS: usize = 2;
/// Largest supported pool depth.
pub const MAX_BUFFERS: usize = 4;
/// Pool depth used when nothing else is configured.
pub const DEFAULT_BUFFERS: usize = 3;

/// Usage every swap-chain buffer is allocated with.
pub const SWAP_CHAIN_USAGE: BufferUsage = BufferUsage::SCANOUT.union(BufferUsage::RENDERING);

pub type Result<T> = std::result::Result<T, SwapChainError>;

/// Ownership state of one swap-chain slot.
///
/// The ordering is meaningful: anything above `Available` is owned by the
/// renderer or the channel and must not be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotState {
    /// No buffer, only seen during creation, after teardown, or after a failed
    /// reallocation.
    None,
    Available,
    /// Handed to the renderer, not yet submitted.
    Acquired,
    /// Queued on the presentation channel, waiting for its completion.
    Submitted,
}

struct Slot<B> {
    buffer: Option<B>,
    state: SlotState,
}

impl<B> Slot<B> {
    fn vacant() -> Self {
        Self {
            buffer: None,
            state: SlotState::None,
        }
    }
}

struct SlotTable<B> {
    slots: Vec<Slot<B>>,
    /// Set once teardown starts; no more buffers are handed out.
    closed: bool,
    /// Set once every buffer has been given back to the channel.
    released: bool,
}

impl<B> SlotTable<B> {
    fn any_in(&self, state: SlotState) -> bool {
        self.slots.iter().any(|slot| slot.state == state)
    }
}

/// State shared between the swap chain and outstanding completions.
struct SlotMonitor<B> {
    table: Mutex<SlotTable<B>>,
    returned: Condvar,
}

impl<B: ChannelBuffer> SlotMonitor<B> {
    fn complete(&self, buffer: &B) {
        let mut table = self.table.lock();
        let Some(index) = table
            .slots
            .iter()
            .position(|slot| slot.buffer.as_ref() == Some(buffer))
        else {
            panic!("presentation channel returned a buffer this swap chain does not own: {buffer:?}");
        };
        let slot = &mut table.slots[index];
        assert_eq!(
            slot.state,
            SlotState::Submitted,
            "completion for slot {index} ({buffer:?}) which was never submitted"
        );
        slot.state = SlotState::Available;
        drop(table);

        debug!(slot = index, handle = %buffer.external_handle(), "buffer returned by presentation channel");
        self.returned.notify_all();
    }
}

/// One-shot notification the presentation channel fires when it hands a
/// submitted buffer back.
///
/// Consuming `self` makes a second completion for the same submission
/// impossible. The body only flips the slot state and wakes waiters.
pub struct Completion<B> {
    monitor: Arc<SlotMonitor<B>>,
}

impl<B: ChannelBuffer> Completion<B> {
    /// Marks `buffer` available again and wakes every blocked acquire.
    ///
    /// # Panics
    /// Panics if `buffer` does not belong to the swap chain or is not in the
    /// `Submitted` state. Either means ownership tracking is corrupt.
    pub fn complete(self, buffer: &B) {
        self.monitor.complete(buffer);
    }
}

impl<B> fmt::Debug for Completion<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// A buffer handed to the renderer by [`SwapChain::acquire`].
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredBuffer<B> {
    /// Index of the slot the buffer lives in.
    pub slot: usize,
    pub buffer: B,
}

/// The swap chain of one surface.
pub struct SwapChain<C: PresentationChannel> {
    channel: Arc<C>,
    monitor: Arc<SlotMonitor<C::Buffer>>,
    format: PixelFormat,
    buffer_count: usize,
    next_to_use: usize,
    acquire_timeout: Option<Duration>,
}

impl<C: PresentationChannel> SwapChain<C> {
    /// Allocates `buffer_count` buffers of `size` from `channel` and marks them
    /// available.
    ///
    /// # Errors
    /// - [`SwapChainError::InvalidBufferCount`] outside `MIN_BUFFERS..=MAX_BUFFERS`.
    /// - [`SwapChainError::AllocationFailed`] if the channel returns no buffer.
    ///   Buffers allocated before the failure are released again.
    pub fn allocate(
        channel: Arc<C>,
        buffer_count: usize,
        size: (u32, u32),
        format: PixelFormat,
    ) -> Result<Self> {
        if !(MIN_BUFFERS..=MAX_BUFFERS).contains(&buffer_count) {
            return Err(SwapChainError::InvalidBufferCount(buffer_count));
        }

        let (width, height) = size;
        info!(buffer_count, width, height, %format, "Allocating swap chain buffers");

        let mut slots: Vec<Slot<C::Buffer>> = (0..buffer_count).map(|_| Slot::vacant()).collect();
        for index in 0..buffer_count {
            let Some(buffer) = channel.allocate(width, height, format, SWAP_CHAIN_USAGE) else {
                error!(index, width, height, "Presentation channel failed to allocate buffer");
                for slot in slots.iter_mut() {
                    if let Some(buffer) = slot.buffer.take() {
                        channel.release(buffer);
                    }
                }
                return Err(SwapChainError::AllocationFailed { index, width, height });
            };

            info!(
                index,
                width = buffer.width(),
                height = buffer.height(),
                handle = %buffer.external_handle(),
                "Allocated buffer"
            );
            let slot = &mut slots[index];
            debug_assert_eq!(slot.state, SlotState::None);
            slot.buffer = Some(buffer);
            slot.state = SlotState::Available;
        }

        Ok(Self {
            channel,
            monitor: Arc::new(SlotMonitor {
                table: Mutex::new(SlotTable {
                    slots,
                    closed: false,
                    released: false,
                }),
                returned: Condvar::new(),
            }),
            format,
            buffer_count,
            next_to_use: 0,
            acquire_timeout: None,
        })
    }

    /// Bounds how long [`acquire`](Self::acquire) may wait for a completion.
    /// `None` (the default) waits indefinitely.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Hands the next available buffer to the renderer.
    ///
    /// Slots are scanned round-robin from `next_to_use`, which advances by one
    /// slot per probe. When a full sweep finds nothing available the call
    /// blocks until a completion arrives and resumes the sweep where it left
    /// off.
    ///
    /// If the acquired buffer does not match `target` (the window size), it is
    /// released and replaced by a freshly allocated buffer of the right size.
    /// That reallocation blocks on the channel.
    ///
    /// # Errors
    /// - [`SwapChainError::Closed`] after [`shutdown`](Self::shutdown).
    /// - [`SwapChainError::Exhausted`] if every slot is acquired, since nothing
    ///   could ever wake the wait.
    /// - [`SwapChainError::AcquireTimeout`] if a timeout is configured and expires.
    /// - [`SwapChainError::AllocationFailed`] if a resize reallocation fails. The
    ///   slot is left empty.
    pub fn acquire(&mut self, target: (u32, u32)) -> Result<AcquiredBuffer<C::Buffer>> {
        let (index, buffer) = self.take_available()?;

        let (width, height) = target;
        if buffer.width() == width && buffer.height() == height {
            debug!(slot = index, handle = %buffer.external_handle(), "Acquired buffer");
            return Ok(AcquiredBuffer { slot: index, buffer });
        }

        info!(
            slot = index,
            from_width = buffer.width(),
            from_height = buffer.height(),
            width,
            height,
            "Buffer size differs from window, reallocating"
        );
        self.channel.release(buffer);
        let replacement = self
            .channel
            .allocate(width, height, self.format, SWAP_CHAIN_USAGE);

        let mut table = self.monitor.table.lock();
        let slot = &mut table.slots[index];
        match replacement {
            Some(buffer) => {
                slot.buffer = Some(buffer.clone());
                debug!(slot = index, handle = %buffer.external_handle(), "Acquired reallocated buffer");
                Ok(AcquiredBuffer { slot: index, buffer })
            }
            None => {
                slot.buffer = None;
                slot.state = SlotState::None;
                error!(slot = index, width, height, "Presentation channel failed to reallocate buffer");
                Err(SwapChainError::AllocationFailed { index, width, height })
            }
        }
    }

    fn take_available(&mut self) -> Result<(usize, C::Buffer)> {
        let deadline = self.acquire_timeout.map(|timeout| Instant::now() + timeout);
        let mut table = self.monitor.table.lock();
        if table.closed {
            return Err(SwapChainError::Closed);
        }

        let count = self.buffer_count;
        let wrap = (self.next_to_use + count - 1) % count;
        loop {
            let index = self.next_to_use;
            self.next_to_use = (index + 1) % count;

            let slot = &mut table.slots[index];
            if slot.state == SlotState::Available {
                if let Some(buffer) = slot.buffer.clone() {
                    slot.state = SlotState::Acquired;
                    return Ok((index, buffer));
                }
            }

            if index != wrap {
                continue;
            }
            if !table.any_in(SlotState::Submitted) {
                warn!("No buffer is in flight, acquire would never return");
                return Err(SwapChainError::Exhausted);
            }

            trace!("All buffers busy, waiting for the presentation channel");
            match (deadline, self.acquire_timeout) {
                (Some(deadline), Some(timeout)) => {
                    if self.monitor.returned.wait_until(&mut table, deadline).timed_out() {
                        warn!(?timeout, "Timed out waiting for a buffer");
                        return Err(SwapChainError::AcquireTimeout(timeout));
                    }
                }
                _ => self.monitor.returned.wait(&mut table),
            }
        }
    }

    /// Moves the acquired buffer carrying `handle` to `Submitted` and queues it
    /// on the presentation channel.
    ///
    /// # Errors
    /// [`SwapChainError::NotAcquired`] if no acquired slot holds `handle`.
    pub fn submit(&mut self, handle: ExternalHandle) -> Result<()> {
        let mut table = self.monitor.table.lock();
        let (index, slot) = table
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| {
                slot.state == SlotState::Acquired
                    && slot.buffer.as_ref().map(ChannelBuffer::external_handle) == Some(handle)
            })
            .ok_or(SwapChainError::NotAcquired(handle))?;
        let Some(buffer) = slot.buffer.clone() else {
            return Err(SwapChainError::NotAcquired(handle));
        };
        slot.state = SlotState::Submitted;
        drop(table);

        debug!(slot = index, %handle, "Submitting buffer");
        self.channel.submit(
            buffer,
            Completion {
                monitor: Arc::clone(&self.monitor),
            },
        );
        Ok(())
    }

    /// Returns an acquired buffer to `Available` without presenting it.
    ///
    /// # Errors
    /// [`SwapChainError::NotAcquired`] if no acquired slot holds `handle`.
    pub fn cancel(&mut self, handle: ExternalHandle) -> Result<()> {
        let mut table = self.monitor.table.lock();
        let slot = table
            .slots
            .iter_mut()
            .find(|slot| {
                slot.state == SlotState::Acquired
                    && slot.buffer.as_ref().map(ChannelBuffer::external_handle) == Some(handle)
            })
            .ok_or(SwapChainError::NotAcquired(handle))?;
        slot.state = SlotState::Available;
        drop(table);

        debug!(%handle, "Cancelled acquisition");
        self.monitor.returned.notify_all();
        Ok(())
    }

    /// Stops handing out buffers, waits until the channel has returned every
    /// submitted buffer and releases all buffers.
    ///
    /// Buffers still acquired are taken back first; the caller is the one
    /// tearing the surface down, so nothing can be rendering into them. Calling
    /// this more than once is a no-op.
    pub fn shutdown(&mut self) {
        let mut table = self.monitor.table.lock();
        if table.released {
            return;
        }
        table.closed = true;

        for (index, slot) in table.slots.iter_mut().enumerate() {
            if slot.state == SlotState::Acquired {
                warn!(slot = index, "Buffer still acquired at shutdown, reclaiming it");
                slot.state = SlotState::Available;
            }
        }

        if table.any_in(SlotState::Submitted) {
            debug!("Waiting for in-flight buffers before teardown");
        }
        while table.slots.iter().any(|slot| slot.state > SlotState::Available) {
            self.monitor.returned.wait(&mut table);
        }

        let buffers: Vec<C::Buffer> = table
            .slots
            .iter_mut()
            .filter_map(|slot| {
                slot.state = SlotState::None;
                slot.buffer.take()
            })
            .collect();
        table.released = true;
        drop(table);

        info!(count = buffers.len(), "Releasing swap chain buffers");
        for buffer in buffers {
            self.channel.release(buffer);
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Slot the next acquire starts probing at.
    pub fn next_to_use(&self) -> usize {
        self.next_to_use
    }

    /// Snapshot of every slot's state, in slot order.
    pub fn states(&self) -> Vec<SlotState> {
        self.monitor
            .table
            .lock()
            .slots
            .iter()
            .map(|slot| slot.state)
            .collect()
    }

    /// Clone of the buffer currently stored in `slot`.
    pub fn buffer(&self, slot: usize) -> Option<C::Buffer> {
        self.monitor
            .table
            .lock()
            .slots
            .get(slot)
            .and_then(|slot| slot.buffer.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.monitor.table.lock().closed
    }
}

impl<C: PresentationChannel> Drop for SwapChain<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: PresentationChannel> fmt::Debug for SwapChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChain")
            .field("format", &self.format)
            .field("buffer_count", &self.buffer_count)
            .field("next_to_use", &self.next_to_use)
            .field("states", &self.states())
            .finish()
    }
}
