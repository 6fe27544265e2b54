//! Fixed-capacity cache of imported buffer objects.
//!
//! Foreign buffers arrive as external handles (typically DMA-BUF file
//! descriptors). Importing one into a locally usable GPU object is expensive,
//! while the presentation channel keeps cycling the same small pool of
//! handles. The cache keeps the most recently used imports alive and drops an
//! import once [`DESTRUCTION_AGE`] other buffers have been used since it was
//! last selected as the back buffer.

use std::fmt;
use std::os::fd::RawFd;

use tracing::{debug, trace};

use crate::error::{CacheError, Result};
use crate::format::PixelFormat;

/// Number of entries in every cache, independent of the swap-chain depth.
pub const CACHE_SLOTS: usize = 4;

/// Number of consecutive non-uses after which an entry is destroyed.
///
/// Swap chains are at most triple buffered upstream, so a buffer that has not
/// come back within three frames is unlikely to come back at all.
pub const DESTRUCTION_AGE: u32 = 3;

/// Identity of a foreign buffer, e.g. a DMA-BUF file descriptor.
///
/// The handle is only used as a key; the cache never closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalHandle(RawFd);

impl ExternalHandle {
    /// Wraps a raw descriptor value.
    pub const fn new(fd: RawFd) -> Self {
        Self(fd)
    }

    /// Returns the raw descriptor value.
    pub const fn raw(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for ExternalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd={}", self.0)
    }
}

/// Everything an importer needs to wrap an external handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub handle: ExternalHandle,
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes.
    pub stride: u32,
    pub format: PixelFormat,
}

/// Turns external buffer handles into local GPU objects.
///
/// Dropping the returned object must release the local import; the cache
/// relies on that to destroy entries on refresh, eviction and teardown.
pub trait BufferImporter {
    /// The locally usable object (e.g. a GBM buffer object).
    type Object;

    /// Imports the described buffer for scanout and rendering.
    ///
    /// Returns `None` when the driver rejects the handle.
    fn import(&self, descriptor: &ImportDescriptor) -> Option<Self::Object>;
}

struct Imported<O> {
    handle: ExternalHandle,
    object: O,
}

/// One slot of the cache.
pub struct CacheEntry<O> {
    imported: Option<Imported<O>>,
    age: u32,
}

impl<O> CacheEntry<O> {
    fn empty() -> Self {
        Self {
            imported: None,
            age: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imported.is_none()
    }

    /// Key of the current occupant, if any.
    pub fn handle(&self) -> Option<ExternalHandle> {
        self.imported.as_ref().map(|imported| imported.handle)
    }

    pub fn object(&self) -> Option<&O> {
        self.imported.as_ref().map(|imported| &imported.object)
    }

    /// Frames since this entry was last the selected back buffer.
    pub fn age(&self) -> u32 {
        self.age
    }
}

impl<O> fmt::Debug for CacheEntry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("handle", &self.handle())
            .field("age", &self.age)
            .finish()
    }
}

/// Maps external handles to imported objects in a fixed array of
/// [`CACHE_SLOTS`] entries.
///
/// The cache has no internal locking. It is only touched from the acquire path
/// of a single surface, which its owner serializes.
pub struct BufferObjectCache<I: BufferImporter> {
    importer: I,
    entries: [CacheEntry<I::Object>; CACHE_SLOTS],
}

impl<I: BufferImporter> BufferObjectCache<I> {
    /// Creates an empty cache that imports through `importer`.
    pub fn new(importer: I) -> Self {
        Self {
            importer,
            entries: std::array::from_fn(|_| CacheEntry::empty()),
        }
    }

    /// Returns the slot holding `handle`, if it is cached.
    pub fn lookup(&self, handle: ExternalHandle) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.handle() == Some(handle))
    }

    /// Imports `descriptor` into `slot`, destroying whatever occupied it first.
    ///
    /// Used both for first sight of a handle and to refresh an entry whose
    /// buffer contents were invalidated upstream.
    ///
    /// # Errors
    /// - [`CacheError::SlotOutOfRange`] if `slot >= CACHE_SLOTS`.
    /// - [`CacheError::ImportFailed`] if the importer rejects the handle. The slot
    ///   is empty afterwards.
    pub fn insert_or_refresh(&mut self, slot: usize, descriptor: &ImportDescriptor) -> Result<()> {
        debug_assert!(
            self.entries
                .iter()
                .enumerate()
                .all(|(index, entry)| index == slot || entry.handle() != Some(descriptor.handle)),
            "handle {} is already cached in another slot",
            descriptor.handle
        );

        let entry = self
            .entries
            .get_mut(slot)
            .ok_or(CacheError::SlotOutOfRange(slot))?;

        if let Some(previous) = entry.imported.take() {
            debug!(slot, handle = %previous.handle, "destroying cached buffer object before re-import");
        }

        debug!(
            slot,
            handle = %descriptor.handle,
            width = descriptor.width,
            height = descriptor.height,
            stride = descriptor.stride,
            format = %descriptor.format,
            "importing buffer"
        );
        let object = self
            .importer
            .import(descriptor)
            .ok_or(CacheError::ImportFailed {
                handle: descriptor.handle,
                width: descriptor.width,
                height: descriptor.height,
            })?;

        entry.imported = Some(Imported {
            handle: descriptor.handle,
            object,
        });
        entry.age = 0;
        Ok(())
    }

    /// Picks the slot a newly seen handle should be imported into.
    ///
    /// The search starts just after `back` so the slot of the buffer that was
    /// most recently rendered into (and may still be in flight) is reused last.
    /// The first empty slot wins; with no empty slot the starting slot is
    /// overwritten.
    pub fn select_eviction_slot(&self, back: Option<usize>) -> usize {
        let start = back.map_or(0, |slot| (slot + 1) % CACHE_SLOTS);
        (0..CACHE_SLOTS)
            .map(|offset| (start + offset) % CACHE_SLOTS)
            .find(|&slot| self.entries[slot].is_empty())
            .unwrap_or(start)
    }

    /// Advances the age of every occupied entry except `used`, whose age is
    /// reset. Entries reaching [`DESTRUCTION_AGE`] are destroyed.
    ///
    /// Returns the number of entries evicted.
    pub fn update_ages(&mut self, used: usize) -> usize {
        let mut evicted = 0;
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if entry.is_empty() {
                continue;
            }
            if slot == used {
                entry.age = 0;
                continue;
            }
            entry.age += 1;
            if entry.age >= DESTRUCTION_AGE {
                if let Some(stale) = entry.imported.take() {
                    debug!(slot, handle = %stale.handle, age = entry.age, "evicting stale buffer object");
                    evicted += 1;
                }
            }
        }
        trace!(used, evicted, "updated cache ages");
        evicted
    }

    /// Destroys every cached object.
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.imported = None;
            entry.age = 0;
        }
    }

    pub fn entry(&self, slot: usize) -> Option<&CacheEntry<I::Object>> {
        self.entries.get(slot)
    }

    /// Imported object stored in `slot`.
    pub fn object(&self, slot: usize) -> Option<&I::Object> {
        self.entries.get(slot).and_then(CacheEntry::object)
    }

    pub fn entries(&self) -> &[CacheEntry<I::Object>] {
        &self.entries
    }

    /// Number of non-empty slots.
    pub fn occupied(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_empty()).count()
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }
}

impl<I: BufferImporter> fmt::Debug for BufferObjectCache<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferObjectCache")
            .field("entries", &self.entries)
            .finish()
    }
}
