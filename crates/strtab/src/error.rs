//! Error types for `strtab`.
//!
//! Every failure is recoverable. A failed mutation leaves the table exactly
//! as it was before the call.

use thiserror::Error;

/// Result type alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interning, restoring, or optimizing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The page provider could not supply a page.
    #[error("allocation failure: could not acquire a {size} byte page")]
    AllocationFailure {
        /// Size of the page that was requested.
        size: usize,
    },

    /// A string (plus its length header) does not fit in a single page.
    #[error("input of {len} bytes does not fit in a {page_size} byte page")]
    InputTooLarge {
        /// Length of the rejected input in bytes.
        len: usize,
        /// Page size of the table.
        page_size: usize,
    },

    /// The next ID would collide with the inline-unsigned tag or overflow.
    #[error("id space exhausted")]
    IdSpaceExhausted,

    /// A restore target is stale, foreign, or refers to a future state.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(&'static str),

    /// Zero was passed where a string ID was expected.
    #[error("invalid string id {0}")]
    InvalidId(u32),

    /// A counted ID has no string in the source table.
    #[error("string id {0} cannot be resolved")]
    UnresolvedId(u32),

    /// The frequency tracker was already consumed by `optimize`.
    #[error("frequency table already consumed by optimize")]
    TrackerConsumed,

    /// The hash seed can only change while the table is empty.
    #[error("hash seed cannot change after the first intern")]
    HashSeedLocked,

    /// The configured page size is below the supported minimum.
    #[error("page size {page_size} is below the minimum of {min} bytes")]
    InvalidPageSize {
        /// The rejected page size.
        page_size: usize,
        /// The minimum page size.
        min: usize,
    },
}
