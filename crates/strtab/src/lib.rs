//! `strtab`: page-arena string table
//!
//! This crate interns byte strings into dense 32-bit IDs. It provides:
//!
//! - **String table**: deduplicated storage with ID-based references and
//!   lookups in both directions
//! - **Page arenas**: fixed-size pages from a pluggable [`PageProvider`],
//!   with snapshot and restore of the allocation position
//! - **Cursor**: sequential traversal of stored strings in ID order
//! - **Frequency optimizer**: rebuilds a table so the most used strings get
//!   the smallest IDs
//!
//! # Architecture
//!
//! A [`StringTable`] owns three [`PageArena`](arena::PageArena)s (strings,
//! hashes, index nodes) and a [`HashIndex`](index::HashIndex) from hash to
//! collision chain. Everything lives in the arenas except the index, so
//! restoring a snapshot only needs to rewind the arenas and rebuild the
//! index.
//!
//! # Example
//!
//! ```rust
//! use strtab::{StringTable, TableConfig};
//!
//! let mut table = StringTable::new(TableConfig::default()).unwrap();
//! let id = table.intern("hello").unwrap();
//!
//! assert_eq!(id.as_u32(), 1);
//! assert_eq!(table.lookup_str(id).as_deref(), Some("hello"));
//! ```
//!
//! # Features
//!
//! - `mmap`: [`MmapPages`](page::MmapPages), a provider backed by anonymous
//!   memory mappings

pub mod arena;
pub mod config;
pub mod cursor;
pub mod error;
pub mod id;
pub mod index;
pub mod optimize;
pub mod page;
pub mod table;

// Re-export commonly used types
pub use config::{DEFAULT_HASH_SEED, DEFAULT_PAGE_SIZE, MIN_PAGE_SIZE, TableConfig};
pub use cursor::{Cursor, Iter};
pub use error::{Error, Result};
pub use id::{INLINE_TAG, StringId};
pub use optimize::{FrequencyTable, optimize};
pub use page::{HeapPages, PageProvider};
pub use table::{StringTable, TableSnapshot, TableStats};
