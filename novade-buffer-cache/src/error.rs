//! Error type for the buffer-object cache.

use crate::cache::ExternalHandle;
use thiserror::Error;

/// Errors raised while importing a foreign buffer into the cache.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The importer could not turn the external handle into a local object.
    /// The targeted cache slot is left empty.
    #[error("Failed to import buffer {handle} ({width}x{height})")]
    ImportFailed {
        handle: ExternalHandle,
        width: u32,
        height: u32,
    },

    /// A slot index outside the fixed cache capacity was passed in.
    #[error("Cache slot {0} is out of range")]
    SlotOutOfRange(usize),
}

/// A specialized `Result` type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
