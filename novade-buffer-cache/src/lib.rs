//! # Novade Buffer Cache
//!
//! This crate keeps locally imported GPU objects for the foreign buffers a
//! presentation channel hands to a client renderer. Buffers are keyed by their
//! external handle, imported once through a [`BufferImporter`], and dropped
//! again once they fall out of the channel's working set.
//!
//! It is used by `novade-render-surface`, whose acquire path resolves every
//! freshly acquired swap-chain buffer to a renderable object through the cache.

pub mod cache;
pub mod error;
pub mod format;

// Re-export key types for convenience.
pub use cache::{
    BufferImporter, BufferObjectCache, CacheEntry, ExternalHandle, ImportDescriptor, CACHE_SLOTS,
    DESTRUCTION_AGE,
};
pub use error::{CacheError, Result};
pub use format::PixelFormat;
