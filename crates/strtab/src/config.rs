//! Table configuration.
//!
//! All settings are fixed when the table is created, except the hash seed,
//! which may still be changed through [`StringTable::set_hash_seed`] until
//! the first string is stored.
//!
//! # Examples
//!
//! ```
//! use strtab::TableConfig;
//!
//! let config = TableConfig::default()
//!     .with_page_size(16 * 1024)
//!     .with_inline_unsigned(true);
//!
//! assert_eq!(config.page_size, 16 * 1024);
//! assert_eq!(config.hash_seed, strtab::DEFAULT_HASH_SEED);
//! ```
//!
//! [`StringTable::set_hash_seed`]: crate::StringTable::set_hash_seed

use crate::error::{Error, Result};

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest supported page size.
///
/// A page must hold at least one index node and one hash record.
pub const MIN_PAGE_SIZE: usize = 64;

/// Default seed of the string hash.
pub const DEFAULT_HASH_SEED: u32 = 5381;

/// Configuration of a [`StringTable`](crate::StringTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Size of every page in all three arenas, in bytes.
    pub page_size: usize,
    /// Initial value of the rolling string hash.
    pub hash_seed: u32,
    /// Encode canonical decimals below `2^31` directly into the ID.
    pub inline_unsigned: bool,
}

impl TableConfig {
    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the hash seed.
    #[must_use]
    pub const fn with_hash_seed(mut self, hash_seed: u32) -> Self {
        self.hash_seed = hash_seed;
        self
    }

    /// Enables or disables inline-unsigned encoding.
    #[must_use]
    pub const fn with_inline_unsigned(mut self, enabled: bool) -> Self {
        self.inline_unsigned = enabled;
        self
    }

    /// Checks that the configuration can back a table.
    pub fn validate(&self) -> Result<()> {
        if self.page_size < MIN_PAGE_SIZE || self.page_size > u32::MAX as usize {
            return Err(Error::InvalidPageSize {
                page_size: self.page_size,
                min: MIN_PAGE_SIZE,
            });
        }
        Ok(())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            hash_seed: DEFAULT_HASH_SEED,
            inline_unsigned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.hash_seed, 5381);
        assert!(!config.inline_unsigned);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = TableConfig::default()
            .with_page_size(128)
            .with_hash_seed(7)
            .with_inline_unsigned(true);
        assert_eq!(config.page_size, 128);
        assert_eq!(config.hash_seed, 7);
        assert!(config.inline_unsigned);
    }

    #[test]
    fn test_page_size_too_small() {
        let config = TableConfig::default().with_page_size(MIN_PAGE_SIZE - 1);
        assert_eq!(
            config.validate(),
            Err(Error::InvalidPageSize { page_size: 63, min: 64 })
        );
    }
}
