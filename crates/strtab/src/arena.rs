//! Page arena for string table storage.
//!
//! A [`PageArena`] is a growable sequence of fixed-size pages with a bump
//! pointer into the last page. It provides:
//!
//! - **Search-free allocation**: bump the offset of the last page, or start a
//!   new page when the request does not fit
//! - **Contiguous allocations**: no allocation ever spans two pages
//! - **Integer references**: [`ArenaRef`] is a `(page, offset)` pair, so
//!   growing the page list never invalidates a reference
//! - **Rewind**: [`PageArena::snapshot`] and [`PageArena::restore`]
//!
//! Individual allocations are never freed. The unused tail of a page that
//! could not satisfy a request is wasted.
//!
//! # Examples
//!
//! ```
//! use strtab::arena::PageArena;
//! use strtab::page::HeapPages;
//!
//! let mut arena = PageArena::new(HeapPages, 64).unwrap();
//!
//! let a = arena.alloc(40).unwrap();
//! arena.slice_mut(a, 5).copy_from_slice(b"hello");
//!
//! let mark = arena.snapshot();
//! let b = arena.alloc(40).unwrap(); // does not fit, starts page 2
//! assert_eq!(b.page(), 1);
//! assert_eq!(arena.page_count(), 2);
//!
//! arena.restore(mark).unwrap();
//! assert_eq!(arena.page_count(), 1);
//! assert_eq!(arena.slice(a, 5), b"hello");
//! ```

use crate::error::{Error, Result};
use crate::page::PageProvider;

/// Location of an allocation inside a [`PageArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaRef {
    page: u32,
    offset: u32,
}

impl ArenaRef {
    /// Creates a reference from a page number and a byte offset.
    #[must_use]
    pub const fn new(page: u32, offset: u32) -> Self {
        Self { page, offset }
    }

    /// Page number of the allocation.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Byte offset of the allocation inside its page.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }
}

/// A rewindable arena position.
///
/// Only meaningful for the arena that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSnapshot {
    /// Number of pages at the time of the snapshot.
    pub page_count: usize,
    /// High-water offset of the last page at the time of the snapshot.
    pub offset: usize,
}

/// Arena capacity accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes physically held in pages.
    pub bytes_allocated: usize,
    /// Bytes handed out by `alloc`.
    pub bytes_used: usize,
    /// Number of pages.
    pub page_count: usize,
}

impl std::ops::Add for ArenaStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            bytes_allocated: self.bytes_allocated + rhs.bytes_allocated,
            bytes_used: self.bytes_used + rhs.bytes_used,
            page_count: self.page_count + rhs.page_count,
        }
    }
}

/// Growable sequence of fixed-size pages with bump allocation.
///
/// The arena always holds at least one page. `offsets[i]` is the high-water
/// mark of page `i`; only the last page is still being filled.
pub struct PageArena<P: PageProvider> {
    /// Source of new pages.
    provider: P,
    /// Pages in allocation order.
    pages: Vec<P::Page>,
    /// Bytes used in each page.
    offsets: Vec<usize>,
    /// Size of every page in bytes.
    page_size: usize,
}

impl<P: PageProvider> PageArena<P> {
    /// Creates an arena and acquires its first page.
    pub fn new(provider: P, page_size: usize) -> Result<Self> {
        let first = provider.acquire(page_size)?;
        Ok(Self {
            provider,
            pages: vec![first],
            offsets: vec![0],
            page_size,
        })
    }

    /// Allocates `size` contiguous bytes.
    ///
    /// The bytes are zeroed on first use of the page, but may hold stale data
    /// after a [`restore`](Self::restore); callers overwrite what they
    /// allocate.
    ///
    /// # Errors
    ///
    /// - [`Error::InputTooLarge`] if `size` exceeds the page size
    /// - [`Error::AllocationFailure`] if a new page is needed and the
    ///   provider cannot supply one
    pub fn alloc(&mut self, size: usize) -> Result<ArenaRef> {
        if size > self.page_size {
            return Err(Error::InputTooLarge {
                len: size,
                page_size: self.page_size,
            });
        }

        if self.page_size - self.last_offset() < size {
            self.add_page()?;
        }

        let page = self.pages.len() - 1;
        let offset = self.offsets[page];
        self.offsets[page] = offset + size;

        Ok(ArenaRef::new(page as u32, offset as u32))
    }

    /// Appends a fresh page and makes it the allocation target.
    #[cold]
    fn add_page(&mut self) -> Result<()> {
        let size = self.page_size;
        self.pages
            .try_reserve(1)
            .and_then(|()| self.offsets.try_reserve(1))
            .map_err(|_| Error::AllocationFailure { size })?;

        let page = self.provider.acquire(size)?;
        self.pages.push(page);
        self.offsets.push(0);

        tracing::trace!(pages = self.pages.len(), page_size = size, "arena grew");
        Ok(())
    }

    /// Returns `len` bytes starting at `at`.
    ///
    /// # Panics
    ///
    /// Panics if the range lies outside the arena's pages.
    #[must_use]
    pub fn slice(&self, at: ArenaRef, len: usize) -> &[u8] {
        let start = at.offset as usize;
        &self.pages[at.page as usize].as_ref()[start..start + len]
    }

    /// Returns `len` mutable bytes starting at `at`.
    ///
    /// # Panics
    ///
    /// Panics if the range lies outside the arena's pages.
    pub fn slice_mut(&mut self, at: ArenaRef, len: usize) -> &mut [u8] {
        let start = at.offset as usize;
        &mut self.pages[at.page as usize].as_mut()[start..start + len]
    }

    /// Returns the used prefix of page `page`, or `None` past the last page.
    #[must_use]
    pub fn page_bytes(&self, page: usize) -> Option<&[u8]> {
        let used = *self.offsets.get(page)?;
        Some(&self.pages[page].as_ref()[..used])
    }

    /// Returns the page provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of pages currently held.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Size of each page in bytes.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    fn last_offset(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Records the current position.
    #[must_use]
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            page_count: self.pages.len(),
            offset: self.last_offset(),
        }
    }

    /// Checks that `snapshot` describes a position at or before the current
    /// one.
    pub fn validate(&self, snapshot: ArenaSnapshot) -> Result<()> {
        if snapshot.page_count == 0 {
            return Err(Error::InvalidSnapshot("page count is zero"));
        }
        if snapshot.page_count > self.pages.len() {
            return Err(Error::InvalidSnapshot("snapshot has more pages than the arena"));
        }
        if snapshot.offset > self.offsets[snapshot.page_count - 1] {
            return Err(Error::InvalidSnapshot("snapshot offset is past the arena position"));
        }
        Ok(())
    }

    /// Rewinds the arena to `snapshot`, releasing every later page.
    ///
    /// Either the whole rewind happens or nothing changes.
    pub fn restore(&mut self, snapshot: ArenaSnapshot) -> Result<()> {
        self.validate(snapshot)?;

        let released = self.pages.len() - snapshot.page_count;
        for page in self.pages.drain(snapshot.page_count..) {
            self.provider.release(page, self.page_size);
        }
        self.offsets.truncate(snapshot.page_count);
        self.offsets[snapshot.page_count - 1] = snapshot.offset;

        if released > 0 {
            tracing::trace!(released, pages = self.pages.len(), "arena truncated");
        }
        Ok(())
    }

    /// Returns capacity statistics.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            bytes_allocated: self.pages.len() * self.page_size,
            bytes_used: self.offsets.iter().sum(),
            page_count: self.pages.len(),
        }
    }
}

impl<P: PageProvider> Drop for PageArena<P> {
    fn drop(&mut self) {
        for page in self.pages.drain(..) {
            self.provider.release(page, self.page_size);
        }
    }
}

impl<P: PageProvider> std::fmt::Debug for PageArena<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageArena")
            .field("page_size", &self.page_size)
            .field("offsets", &self.offsets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HeapPages;

    const PAGE: usize = 256;

    fn arena() -> PageArena<HeapPages> {
        PageArena::new(HeapPages, PAGE).unwrap()
    }

    /// Fills ten pages worth of `alloc_size` allocations and checks every
    /// placement, then checks the bytes survived.
    fn check_alloc_pattern(alloc_size: usize) {
        let mut arena = arena();
        let total = PAGE * 10 / alloc_size;
        let mut refs = Vec::with_capacity(total);

        let mut page = 0;
        let mut offset = 0;
        for i in 0..total {
            let r = arena.alloc(alloc_size).unwrap();
            if offset + alloc_size > PAGE {
                page += 1;
                offset = 0;
            }
            assert_eq!(r, ArenaRef::new(page, offset as u32));
            offset += alloc_size;

            arena.slice_mut(r, alloc_size).fill((i % 255) as u8);
            refs.push(r);
        }

        for (i, &r) in refs.iter().enumerate() {
            assert!(arena.slice(r, alloc_size).iter().all(|&b| b == (i % 255) as u8));
        }
    }

    #[test]
    fn test_alloc_patterns() {
        for size in [3, 4, 111, PAGE / 2 + 1, PAGE] {
            check_alloc_pattern(size);
        }
    }

    #[test]
    fn test_alloc_too_large() {
        let mut arena = arena();
        assert_eq!(
            arena.alloc(PAGE + 1),
            Err(Error::InputTooLarge { len: PAGE + 1, page_size: PAGE })
        );
        assert_eq!(arena.page_count(), 1);
    }

    #[test]
    fn test_abandoned_tail_is_not_reused() {
        let mut arena = arena();
        arena.alloc(200).unwrap();
        arena.alloc(100).unwrap();
        // The 56 byte tail of page 0 is wasted even for small requests.
        let r = arena.alloc(8).unwrap();
        assert_eq!(r, ArenaRef::new(1, 100));
        assert_eq!(arena.page_bytes(0).unwrap().len(), 200);
    }

    #[test]
    fn test_stats() {
        let mut arena = arena();
        arena.alloc(200).unwrap();
        arena.alloc(100).unwrap();
        assert_eq!(
            arena.stats(),
            ArenaStats { bytes_allocated: 2 * PAGE, bytes_used: 300, page_count: 2 }
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let mut arena = arena();
        let a = arena.alloc(100).unwrap();
        arena.slice_mut(a, 3).copy_from_slice(b"abc");
        let mark = arena.snapshot();
        assert_eq!(mark, ArenaSnapshot { page_count: 1, offset: 100 });

        for _ in 0..10 {
            arena.alloc(200).unwrap();
        }
        assert_eq!(arena.page_count(), 11);

        arena.restore(mark).unwrap();
        assert_eq!(arena.snapshot(), mark);
        assert_eq!(arena.slice(a, 3), b"abc");

        // Allocation resumes at the restored position.
        assert_eq!(arena.alloc(10).unwrap(), ArenaRef::new(0, 100));
    }

    #[test]
    fn test_restore_rejects_invalid() {
        let mut arena = arena();
        arena.alloc(100).unwrap();
        let current = arena.snapshot();

        assert!(matches!(
            arena.restore(ArenaSnapshot { page_count: 0, offset: 0 }),
            Err(Error::InvalidSnapshot(_))
        ));
        assert!(matches!(
            arena.restore(ArenaSnapshot { page_count: 2, offset: 0 }),
            Err(Error::InvalidSnapshot(_))
        ));
        assert!(matches!(
            arena.restore(ArenaSnapshot { page_count: 1, offset: 101 }),
            Err(Error::InvalidSnapshot(_))
        ));
        assert_eq!(arena.snapshot(), current);
    }

    #[test]
    fn test_restore_to_future_after_rewind_fails() {
        let mut arena = arena();
        let start = arena.snapshot();
        arena.alloc(200).unwrap();
        arena.alloc(200).unwrap();
        let end = arena.snapshot();

        arena.restore(start).unwrap();
        assert!(arena.restore(end).is_err());
    }

    #[test]
    fn test_restore_within_earlier_page() {
        let mut arena = arena();
        arena.alloc(200).unwrap();
        arena.alloc(200).unwrap();
        // Page 0 stopped at 200, so any offset up to 200 is valid.
        arena.restore(ArenaSnapshot { page_count: 1, offset: 150 }).unwrap();
        assert_eq!(arena.page_count(), 1);
        assert_eq!(arena.alloc(100).unwrap(), ArenaRef::new(0, 150));
        assert_eq!(arena.alloc(100).unwrap(), ArenaRef::new(1, 0));
    }
}
