//! Page providers.
//!
//! A [`PageArena`](crate::arena::PageArena) never talks to the allocator
//! directly. It asks a [`PageProvider`] for fixed-size, zero-filled pages and
//! hands them back when a restore truncates the arena or the arena is
//! dropped.
//!
//! - [`HeapPages`]: pages from the global allocator (the default)
//! - [`MmapPages`]: anonymous memory mappings (requires the `mmap` feature)
//!
//! # Examples
//!
//! ```
//! use strtab::page::{HeapPages, PageProvider};
//!
//! let pages = HeapPages;
//! let page = pages.acquire(4096).unwrap();
//! assert_eq!(page.as_ref().len(), 4096);
//! assert!(page.as_ref().iter().all(|&b| b == 0));
//! pages.release(page, 4096);
//! ```

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Alignment of heap pages.
const PAGE_ALIGNMENT: usize = 8;

/// Source of fixed-size page buffers.
///
/// Implementations must return zero-filled buffers of exactly `size` bytes.
pub trait PageProvider {
    /// Owned page buffer.
    type Page: AsRef<[u8]> + AsMut<[u8]>;

    /// Acquires a zero-filled page of `size` bytes.
    fn acquire(&self, size: usize) -> Result<Self::Page>;

    /// Returns a page to the provider.
    fn release(&self, page: Self::Page, _size: usize) {
        drop(page);
    }
}

/// Pages allocated from the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapPages;

/// A page allocated by [`HeapPages`].
///
/// The memory is released when the page is dropped.
pub struct HeapPage {
    /// Start of the page's memory region.
    start: NonNull<u8>,
    /// Length of the page in bytes.
    len: usize,
}

// SAFETY: HeapPage uniquely owns its allocation, like a Box<[u8]>.
unsafe impl Send for HeapPage {}
unsafe impl Sync for HeapPage {}

impl HeapPage {
    fn layout(len: usize) -> Option<Layout> {
        Layout::from_size_align(len, PAGE_ALIGNMENT).ok()
    }

    fn new(len: usize) -> Result<Self> {
        let layout = match Self::layout(len) {
            Some(layout) if len > 0 => layout,
            _ => return Err(Error::AllocationFailure { size: len }),
        };

        // SAFETY: layout has a non-zero size (checked above).
        let start = unsafe { alloc::alloc_zeroed(layout) };
        let start = NonNull::new(start).ok_or(Error::AllocationFailure { size: len })?;

        Ok(Self { start, len })
    }
}

impl AsRef<[u8]> for HeapPage {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: start points to len initialized (zeroed) bytes owned by self.
        unsafe { std::slice::from_raw_parts(self.start.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for HeapPage {
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: start points to len initialized bytes uniquely owned by self.
        unsafe { std::slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
    }
}

impl Drop for HeapPage {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.len) {
            // SAFETY: start was allocated in `new` with this exact layout.
            unsafe { alloc::dealloc(self.start.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage").field("len", &self.len).finish()
    }
}

impl PageProvider for HeapPages {
    type Page = HeapPage;

    fn acquire(&self, size: usize) -> Result<HeapPage> {
        HeapPage::new(size)
    }
}

/// Pages backed by anonymous private memory mappings.
#[cfg(feature = "mmap")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MmapPages;

#[cfg(feature = "mmap")]
impl PageProvider for MmapPages {
    type Page = memmap2::MmapMut;

    fn acquire(&self, size: usize) -> Result<memmap2::MmapMut> {
        memmap2::MmapMut::map_anon(size).map_err(|e| {
            tracing::warn!(size, error = %e, "anonymous page mapping failed");
            Error::AllocationFailure { size }
        })
    }
}
