//! String identifiers.
//!
//! A [`StringId`] is a 32-bit code for an interned string. Stored strings get
//! dense IDs starting at 1 in creation order. When inline-unsigned encoding
//! is enabled, canonical decimal strings below `2^31` are not stored at all:
//! their value is carried in the low 31 bits of the ID and the high bit
//! ([`INLINE_TAG`]) marks the ID as inline.
//!
//! # Examples
//!
//! ```
//! use strtab::StringId;
//!
//! let stored = StringId::new(42);
//! assert!(!stored.is_inline());
//!
//! let inline = StringId::inline(42);
//! assert!(inline.is_inline());
//! assert_eq!(inline.inline_value(), Some(42));
//! assert_eq!(inline.as_u32(), 0x8000_002A);
//! ```

use std::fmt;

/// High bit that marks an inline-unsigned ID.
pub const INLINE_TAG: u32 = 0x8000_0000;

/// Longest decimal that can be inlined (`2147483647`).
const MAX_INLINE_DIGITS: usize = 10;

/// Identifier of an interned string.
///
/// - O(1) equality and ordering (compares the raw `u32`)
/// - 4 bytes, `Copy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(u32);

impl StringId {
    /// Creates an ID from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Creates the inline ID for `value`.
    ///
    /// `value` must be below [`INLINE_TAG`]; higher bits are discarded.
    #[must_use]
    pub const fn inline(value: u32) -> Self {
        Self((value & !INLINE_TAG) | INLINE_TAG)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw ID value as usize.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns true if the tag bit is set.
    ///
    /// Only tables with inline-unsigned encoding enabled treat such IDs as
    /// inline values.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        self.0 & INLINE_TAG != 0
    }

    /// Returns the integer carried by an inline ID.
    #[must_use]
    pub const fn inline_value(self) -> Option<u32> {
        if self.is_inline() {
            Some(self.0 & !INLINE_TAG)
        } else {
            None
        }
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inline_value() {
            Some(value) => write!(f, "StringId(#{value})"),
            None => write!(f, "StringId({})", self.0),
        }
    }
}

impl From<u32> for StringId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<StringId> for u32 {
    fn from(id: StringId) -> Self {
        id.0
    }
}

/// Parses a canonical decimal that fits in an inline ID.
///
/// Accepts 1 to 10 ASCII digits without leading zeros (except `"0"`) whose
/// value is below [`INLINE_TAG`]. Leading zeros are rejected so that the
/// formatted value always reproduces the input.
#[must_use]
pub(crate) fn parse_inline(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > MAX_INLINE_DIGITS {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }

    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
    }

    (value < u64::from(INLINE_TAG)).then_some(value as u32)
}

/// Formats an inline value as decimal bytes.
#[must_use]
pub(crate) fn format_inline(value: u32) -> Vec<u8> {
    value.to_string().into_bytes()
}
