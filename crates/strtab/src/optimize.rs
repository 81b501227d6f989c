//! Frequency-driven dictionary reordering.
//!
//! A [`FrequencyTable`] counts how often each ID is used. [`optimize`] then
//! builds a new table in which the most frequently counted string gets ID 1,
//! the next one ID 2, and so on. Strings that were never counted are left
//! out; call [`FrequencyTable::add_all`] first to keep every entry.
//!
//! # Examples
//!
//! ```
//! use strtab::{FrequencyTable, StringTable, TableConfig, optimize};
//!
//! let mut table = StringTable::new(TableConfig::default()).unwrap();
//! let rare = table.intern("rare").unwrap();
//! let common = table.intern("common").unwrap();
//!
//! let mut freq = FrequencyTable::new();
//! freq.add(rare).unwrap();
//! freq.add(common).unwrap();
//! freq.add(common).unwrap();
//!
//! let optimized = optimize(&table, &mut freq).unwrap();
//! assert_eq!(optimized.lookup("common").unwrap().as_u32(), 1);
//! assert_eq!(optimized.lookup("rare").unwrap().as_u32(), 2);
//! ```

use crate::error::{Error, Result};
use crate::id::StringId;
use crate::page::PageProvider;
use crate::table::StringTable;

/// Usage counts per stored ID.
///
/// A frequency table can drive a single [`optimize`] call; afterwards it
/// rejects further use.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    /// `counts[id - 1]` is the count of `id`.
    counts: Vec<u32>,
    /// IDs carrying [`INLINE_TAG`](crate::INLINE_TAG) are inline values,
    /// not stored entries.
    inline_unsigned: bool,
    consumed: bool,
}

impl FrequencyTable {
    /// Creates an empty frequency table that treats tagged IDs as inline
    /// values.
    ///
    /// This suits every table with inline-unsigned encoding enabled, and any
    /// table holding fewer than `2^31` entries. Use
    /// [`for_table`](Self::for_table) to follow a table's own setting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: Vec::new(),
            inline_unsigned: true,
            consumed: false,
        }
    }

    /// Creates an empty frequency table matching the inline-unsigned setting
    /// of `table`.
    ///
    /// With the setting off, IDs at or above `2^31` are ordinary stored IDs
    /// and are counted.
    #[must_use]
    pub fn for_table<P: PageProvider>(table: &StringTable<P>) -> Self {
        Self {
            inline_unsigned: table.config().inline_unsigned,
            ..Self::new()
        }
    }

    /// Returns true if `id` names a stored entry rather than an inline value.
    fn tracks(&self, id: StringId) -> bool {
        !(self.inline_unsigned && id.is_inline())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.consumed {
            return Err(Error::TrackerConsumed);
        }
        Ok(())
    }

    /// Grows `counts` to cover IDs up to `max_id`.
    fn reserve_ids(&mut self, max_id: u32) -> Result<()> {
        let required = max_id as usize;
        if required > self.counts.len() {
            self.counts
                .try_reserve(required - self.counts.len())
                .map_err(|_| Error::AllocationFailure {
                    size: required * std::mem::size_of::<u32>(),
                })?;
            self.counts.resize(required, 0);
        }
        Ok(())
    }

    /// Counts one use of `id`.
    ///
    /// Inline IDs are accepted and ignored since they are never stored. Which
    /// IDs count as inline depends on how the table was created; see
    /// [`for_table`](Self::for_table).
    ///
    /// # Errors
    ///
    /// - [`Error::TrackerConsumed`] after a successful [`optimize`]
    /// - [`Error::InvalidId`] for ID 0
    ///
    /// # Examples
    ///
    /// ```
    /// use strtab::{Error, FrequencyTable, StringId};
    ///
    /// let mut freq = FrequencyTable::new();
    /// freq.add(StringId::new(2)).unwrap();
    /// freq.add(StringId::new(2)).unwrap();
    /// freq.add(StringId::inline(7)).unwrap(); // ignored
    ///
    /// assert_eq!(freq.count(StringId::new(2)), 2);
    /// assert_eq!(freq.max_id(), 2);
    /// assert_eq!(freq.add(StringId::new(0)), Err(Error::InvalidId(0)));
    /// ```
    pub fn add(&mut self, id: StringId) -> Result<()> {
        self.ensure_live()?;
        if !self.tracks(id) {
            return Ok(());
        }
        if id.as_u32() == 0 {
            return Err(Error::InvalidId(0));
        }

        self.reserve_ids(id.as_u32())?;
        let count = &mut self.counts[id.as_usize() - 1];
        *count = count.saturating_add(1);
        Ok(())
    }

    /// Counts one use of every ID currently stored in `table`.
    pub fn add_all<P: PageProvider>(&mut self, table: &StringTable<P>) -> Result<()> {
        self.ensure_live()?;
        let total = table.count();
        self.reserve_ids(total)?;
        for count in &mut self.counts[..total as usize] {
            *count = count.saturating_add(1);
        }
        Ok(())
    }

    /// Returns the count recorded for `id`.
    #[must_use]
    pub fn count(&self, id: StringId) -> u32 {
        match id.as_usize().checked_sub(1) {
            Some(slot) => self.counts.get(slot).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Returns the highest ID the table has room for.
    #[must_use]
    pub fn max_id(&self) -> u32 {
        self.counts.len() as u32
    }

    /// Returns true once an [`optimize`] call has used this table.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Returns counted IDs ordered by descending count.
    ///
    /// Equal counts keep ascending ID order.
    fn ranked(&self) -> Vec<u32> {
        let mut ranked: Vec<(u32, u32)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(slot, &count)| (slot as u32 + 1, count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a reordered copy of `table` from the counts in `frequency`.
///
/// The new table has the same configuration and page provider as `table`.
/// Its IDs follow descending count; strings with a count of zero are not
/// copied. On success `frequency` is consumed.
///
/// # Errors
///
/// - [`Error::TrackerConsumed`] if `frequency` was already used
/// - [`Error::UnresolvedId`] if a counted ID does not exist in `table`
/// - any error from creating or interning into the new table
pub fn optimize<P>(table: &StringTable<P>, frequency: &mut FrequencyTable) -> Result<StringTable<P>>
where
    P: PageProvider + Clone,
{
    frequency.ensure_live()?;

    let ranked = frequency.ranked();
    let mut optimized = table.empty_like()?;
    for &id in &ranked {
        let bytes = table
            .lookup_id(StringId::new(id))
            .ok_or(Error::UnresolvedId(id))?;
        optimized.intern(&bytes)?;
    }

    frequency.consumed = true;
    tracing::debug!(
        source = table.count(),
        optimized = optimized.count(),
        "optimized string table"
    );
    Ok(optimized)
}
