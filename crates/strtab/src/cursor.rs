//! Sequential reader over a table's strings.
//!
//! Strings are stored back to back in the string arena, length-prefixed, in
//! ID order. A [`Cursor`] walks that arena directly and never touches the
//! hash index.
//!
//! A cursor starts *before the first* entry, is *positioned* on an entry
//! after each successful [`Cursor::next`], and becomes *exhausted* for good
//! once the arena is consumed. The cursor borrows the table, so the table
//! cannot change underneath it.
//!
//! # Examples
//!
//! ```
//! use strtab::{Cursor, StringTable, TableConfig};
//!
//! let mut table = StringTable::new(TableConfig::default()).unwrap();
//! table.intern("alpha").unwrap();
//! table.intern("beta").unwrap();
//!
//! let mut cursor = Cursor::new(&table);
//! assert_eq!(cursor.current_id(), None);
//!
//! let mut seen = Vec::new();
//! while cursor.next() {
//!     let id = cursor.current_id().unwrap().as_u32();
//!     seen.push((cursor.current_string().unwrap().to_vec(), id));
//! }
//! assert_eq!(seen, vec![(b"alpha".to_vec(), 1), (b"beta".to_vec(), 2)]);
//! assert_eq!(cursor.current_string(), None);
//! ```

use crate::arena::PageArena;
use crate::id::StringId;
use crate::page::{HeapPages, PageProvider};
use crate::table::{LEN_HEADER, StringTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeFirst,
    Positioned { id: u32, len: usize },
    Exhausted,
}

/// Forward-only reader over a table's entries in ID order.
pub struct Cursor<'a, P: PageProvider = HeapPages> {
    strings: &'a PageArena<P>,
    page: usize,
    offset: usize,
    state: State,
}

impl<'a, P: PageProvider> Cursor<'a, P> {
    /// Creates a cursor positioned before the first entry of `table`.
    #[must_use]
    pub fn new(table: &'a StringTable<P>) -> Self {
        Self {
            strings: table.string_arena(),
            page: 0,
            offset: 0,
            state: State::BeforeFirst,
        }
    }

    /// Advances to the next entry.
    ///
    /// Returns `false`, and stays exhausted, once every entry has been
    /// visited.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtab::{StringTable, TableConfig};
    ///
    /// let mut table = StringTable::new(TableConfig::default()).unwrap();
    /// table.intern("only").unwrap();
    ///
    /// let mut cursor = table.cursor();
    /// assert!(cursor.next());
    /// assert_eq!(cursor.current_string(), Some(&b"only"[..]));
    /// assert!(!cursor.next());
    /// assert!(cursor.is_exhausted());
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let id = match self.state {
            State::Exhausted => return false,
            State::BeforeFirst => 1,
            State::Positioned { id, len } => {
                self.offset += LEN_HEADER + len;
                id + 1
            }
        };

        loop {
            let Some(page) = self.strings.page_bytes(self.page) else {
                self.state = State::Exhausted;
                return false;
            };

            if self.offset < page.len() {
                let Some(header) = page.get(self.offset..self.offset + LEN_HEADER) else {
                    self.state = State::Exhausted;
                    return false;
                };
                let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
                self.state = State::Positioned { id, len: len as usize };
                return true;
            }

            self.page += 1;
            self.offset = 0;
        }
    }

    /// Returns the bytes of the current entry.
    #[must_use]
    pub fn current_string(&self) -> Option<&'a [u8]> {
        let State::Positioned { len, .. } = self.state else {
            return None;
        };
        let page = self.strings.page_bytes(self.page)?;
        let start = self.offset + LEN_HEADER;
        page.get(start..start + len)
    }

    /// Returns the ID of the current entry.
    #[must_use]
    pub fn current_id(&self) -> Option<StringId> {
        match self.state {
            State::Positioned { id, .. } => Some(StringId::new(id)),
            State::BeforeFirst | State::Exhausted => None,
        }
    }

    /// Returns true once the cursor has run past the last entry.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }
}

/// Iterator over `(id, bytes)` pairs in ID order.
pub struct Iter<'a, P: PageProvider = HeapPages> {
    cursor: Cursor<'a, P>,
}

impl<'a, P: PageProvider> Iterator for Iter<'a, P> {
    type Item = (StringId, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.cursor.next() {
            return None;
        }
        Some((self.cursor.current_id()?, self.cursor.current_string()?))
    }
}

impl<P: PageProvider> StringTable<P> {
    /// Returns a cursor positioned before the first entry.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_, P> {
        Cursor::new(self)
    }

    /// Iterates over stored entries in ID order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, P> {
        Iter { cursor: Cursor::new(self) }
    }
}

impl<'a, P: PageProvider> IntoIterator for &'a StringTable<P> {
    type Item = (StringId, &'a [u8]);
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
