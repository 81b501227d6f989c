//! String table with ID-based references.
//!
//! A [`StringTable`] interns byte strings into dense 32-bit [`StringId`]s.
//! Storage is split over three [`PageArena`]s:
//!
//! - `strings`: length-prefixed string records, back to back in creation
//!   order
//! - `hashes`: one `u32` hash per ID, so `hashes[id - 1]` is the hash of `id`
//! - `nodes`: fixed-size [`IndexNode`] records forming the collision chains
//!
//! A [`HashIndex`] maps each distinct hash to the first node created with it.
//! Later entries with the same hash but different bytes are appended to that
//! node's chain.
//!
//! # Examples
//!
//! ```
//! use strtab::{StringTable, TableConfig};
//!
//! let mut table = StringTable::new(TableConfig::default()).unwrap();
//!
//! let alpha = table.intern("alpha").unwrap();
//! let beta = table.intern("beta").unwrap();
//! assert_eq!(table.intern("alpha").unwrap(), alpha);
//! assert_eq!((alpha.as_u32(), beta.as_u32()), (1, 2));
//!
//! assert_eq!(table.lookup("beta"), Some(beta));
//! assert_eq!(table.lookup_id(alpha).as_deref(), Some(&b"alpha"[..]));
//!
//! let mark = table.snapshot();
//! table.intern("gamma").unwrap();
//! table.restore(&mark).unwrap();
//! assert_eq!(table.count(), 2);
//! assert_eq!(table.lookup("gamma"), None);
//! ```
//!
//! # Performance
//!
//! - **Intern / lookup**: O(n) hash + O(log h) tree search + O(chain)
//!   comparisons
//! - **`lookup_id`**: O(1) hash fetch + O(log h) search + O(chain)
//! - **Restore**: O(entries) index rebuild

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::arena::{ArenaRef, ArenaSnapshot, ArenaStats, PageArena};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::id::{self, INLINE_TAG, StringId};
use crate::index::{HashIndex, IndexNode, NEXT_OFFSET, NODE_SIZE, NodeRef};
use crate::page::{HeapPages, PageProvider};

/// Size of the length header in front of every string record.
pub(crate) const LEN_HEADER: usize = 4;

/// Size of a hash record.
const HASH_SIZE: usize = 4;

/// Source of table identities stamped into snapshots.
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Position of a [`StringTable`] that [`StringTable::restore`] can rewind to.
///
/// A snapshot stays valid as long as none of the entries it covers has been
/// discarded by a restore, even if the table grew again afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSnapshot {
    table: u64,
    /// Number of truncating restores performed before the snapshot.
    generation: u64,
    strings: ArenaSnapshot,
    hashes: ArenaSnapshot,
    nodes: ArenaSnapshot,
    total: u32,
}

impl TableSnapshot {
    /// Number of stored entries at the time of the snapshot.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.total
    }

    /// Returns true if both describe the same arena position and count,
    /// regardless of generation.
    fn same_position(&self, other: &Self) -> bool {
        self.strings == other.strings
            && self.hashes == other.hashes
            && self.nodes == other.nodes
            && self.total == other.total
    }
}

/// Capacity accounting for each arena of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// String record arena.
    pub strings: ArenaStats,
    /// Hash record arena.
    pub hashes: ArenaStats,
    /// Index node arena.
    pub nodes: ArenaStats,
}

impl TableStats {
    /// Sum over the three arenas.
    #[must_use]
    pub fn total(&self) -> ArenaStats {
        self.strings + self.hashes + self.nodes
    }
}

/// Outcome of walking a chain for a byte string.
enum Probe {
    /// No chain exists for the hash.
    Empty,
    /// The bytes are already stored under this ID.
    Found(StringId),
    /// The chain exists but does not contain the bytes; this is its tail.
    Tail(NodeRef),
}

/// Arena positions taken before an entry is written.
struct Marks {
    strings: ArenaSnapshot,
    hashes: ArenaSnapshot,
    nodes: ArenaSnapshot,
}

/// Interning table mapping byte strings to dense IDs.
///
/// IDs are assigned in strict creation order starting at 1 and are never
/// reused. Entries are immutable once created; the only way to remove them
/// is [`restore`](Self::restore) to an earlier [`TableSnapshot`].
///
/// The table is single-threaded. Share it across threads only behind
/// external synchronization.
pub struct StringTable<P: PageProvider = HeapPages> {
    strings: PageArena<P>,
    hashes: PageArena<P>,
    nodes: PageArena<P>,
    index: HashIndex,
    /// Number of stored entries; also the last assigned ID.
    total: u32,
    config: TableConfig,
    /// Identity stamped into snapshots.
    table_id: u64,
    /// Number of truncating restores so far.
    generation: u64,
    /// `(generation left, total restored to)` for past restores, keeping only
    /// the entries that are a suffix minimum; totals strictly increase.
    floors: Vec<(u64, u32)>,
}

impl StringTable<HeapPages> {
    /// Creates an empty table backed by heap pages.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the first pages cannot be
    /// allocated.
    pub fn new(config: TableConfig) -> Result<Self> {
        Self::with_provider(config, HeapPages)
    }
}

impl<P: PageProvider + Clone> StringTable<P> {
    /// Creates an empty table whose arenas take pages from `provider`.
    pub fn with_provider(config: TableConfig, provider: P) -> Result<Self> {
        config.validate()?;

        let page_size = config.page_size;
        let table = Self {
            strings: PageArena::new(provider.clone(), page_size)?,
            hashes: PageArena::new(provider.clone(), page_size)?,
            nodes: PageArena::new(provider, page_size)?,
            index: HashIndex::new(),
            total: 0,
            config,
            table_id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            floors: Vec::new(),
        };

        tracing::debug!(
            page_size,
            inline_unsigned = config.inline_unsigned,
            "created string table"
        );
        Ok(table)
    }

    /// Creates an empty table with the same configuration and provider.
    pub(crate) fn empty_like(&self) -> Result<Self> {
        Self::with_provider(self.config, self.strings.provider().clone())
    }
}

impl<P: PageProvider> StringTable<P> {
    /// Changes the hash seed.
    ///
    /// # Errors
    ///
    /// [`Error::HashSeedLocked`] once any string has been stored.
    pub fn set_hash_seed(&mut self, seed: u32) -> Result<()> {
        if self.total > 0 {
            return Err(Error::HashSeedLocked);
        }
        self.config.hash_seed = seed;
        Ok(())
    }

    /// Returns the table configuration.
    #[must_use]
    pub const fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns the page size shared by all arenas.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the number of stored entries.
    ///
    /// Inline-unsigned IDs are never stored and are not counted.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.total
    }

    /// Returns true if no entry is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Hashes `bytes` with the table seed (`h = h * 33 + byte`).
    #[must_use]
    pub fn hash(&self, bytes: &[u8]) -> u32 {
        bytes.iter().fold(self.config.hash_seed, |h, &b| {
            h.wrapping_mul(33).wrapping_add(u32::from(b))
        })
    }

    fn inline_id(&self, bytes: &[u8]) -> Option<StringId> {
        if !self.config.inline_unsigned {
            return None;
        }
        id::parse_inline(bytes).map(StringId::inline)
    }

    /// Interns `bytes`, returning its ID.
    ///
    /// Interning the same bytes again returns the same ID without storing
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`Error::InputTooLarge`] if the string does not fit in one page
    /// - [`Error::IdSpaceExhausted`] if no ID is left
    /// - [`Error::AllocationFailure`] if a page cannot be acquired
    ///
    /// On error the table is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtab::{StringTable, TableConfig};
    ///
    /// let mut table = StringTable::new(TableConfig::default()).unwrap();
    ///
    /// let first = table.intern("myVariable").unwrap();
    /// let again = table.intern(b"myVariable").unwrap();
    /// assert_eq!(first, again);
    /// assert_eq!(table.count(), 1);
    /// ```
    pub fn intern(&mut self, bytes: impl AsRef<[u8]>) -> Result<StringId> {
        let bytes = bytes.as_ref();
        if let Some(id) = self.inline_id(bytes) {
            return Ok(id);
        }

        let hash = self.hash(bytes);
        match self.probe(hash, bytes) {
            Probe::Found(id) => Ok(id),
            Probe::Empty => {
                let (node, id) = self.create_entry(hash, bytes)?;
                self.index.insert(hash, node);
                Ok(id)
            }
            Probe::Tail(tail) => self.intern_collision(tail, hash, bytes),
        }
    }

    #[cold]
    fn intern_collision(&mut self, tail: NodeRef, hash: u32, bytes: &[u8]) -> Result<StringId> {
        let (node, id) = self.create_entry(hash, bytes)?;
        self.set_next(tail, Some(node));
        tracing::trace!(hash, id = id.as_u32(), "hash collision chained");
        Ok(id)
    }

    /// Returns the ID of `bytes` without interning it.
    #[must_use]
    pub fn lookup(&self, bytes: impl AsRef<[u8]>) -> Option<StringId> {
        let bytes = bytes.as_ref();
        if let Some(id) = self.inline_id(bytes) {
            return Some(id);
        }

        match self.probe(self.hash(bytes), bytes) {
            Probe::Found(id) => Some(id),
            Probe::Empty | Probe::Tail(_) => None,
        }
    }

    /// Returns the bytes of `id`.
    ///
    /// Stored entries are borrowed from the string arena. Inline IDs (when
    /// enabled) are formatted into a fresh buffer. Returns `None` for 0 and
    /// for IDs that were never assigned or were removed by a restore.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtab::{StringId, StringTable, TableConfig};
    ///
    /// let mut table =
    ///     StringTable::new(TableConfig::default().with_inline_unsigned(true)).unwrap();
    ///
    /// let word = table.intern("word").unwrap();
    /// let number = table.intern("42").unwrap();
    ///
    /// assert_eq!(table.lookup_id(word).as_deref(), Some(&b"word"[..]));
    /// assert_eq!(table.lookup_id(number).as_deref(), Some(&b"42"[..]));
    /// assert_eq!(table.lookup_id(StringId::new(2)), None);
    /// ```
    #[must_use]
    pub fn lookup_id(&self, id: StringId) -> Option<Cow<'_, [u8]>> {
        if self.config.inline_unsigned
            && let Some(value) = id.inline_value()
        {
            return Some(Cow::Owned(id::format_inline(value)));
        }

        let raw = id.as_u32();
        if raw == 0 || raw > self.total {
            return None;
        }

        let hash = self.hash_of(raw);
        let mut cursor = self.index.search(hash);
        while let Some(at) = cursor {
            let node = self.read_node(at);
            if node.id == raw {
                return Some(Cow::Borrowed(self.string_at(node.string)));
            }
            cursor = node.next;
        }
        None
    }

    /// Returns the bytes of `id` as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn lookup_str(&self, id: StringId) -> Option<Cow<'_, str>> {
        match self.lookup_id(id)? {
            Cow::Borrowed(bytes) => Some(String::from_utf8_lossy(bytes)),
            Cow::Owned(bytes) => Some(Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())),
        }
    }

    fn probe(&self, hash: u32, bytes: &[u8]) -> Probe {
        let Some(mut at) = self.index.search(hash) else {
            return Probe::Empty;
        };
        loop {
            let node = self.read_node(at);
            if self.string_at(node.string) == bytes {
                return Probe::Found(StringId::new(node.id));
            }
            match node.next {
                Some(next) => at = next,
                None => return Probe::Tail(at),
            }
        }
    }

    fn next_id(&self) -> Result<u32> {
        let id = self.total.checked_add(1).ok_or(Error::IdSpaceExhausted)?;
        if self.config.inline_unsigned && id >= INLINE_TAG {
            return Err(Error::IdSpaceExhausted);
        }
        Ok(id)
    }

    /// Stores a new entry and returns its node, without linking it into the
    /// index. Nothing is left behind on failure.
    fn create_entry(&mut self, hash: u32, bytes: &[u8]) -> Result<(NodeRef, StringId)> {
        let id = self.next_id()?;
        if bytes.len() + LEN_HEADER > self.config.page_size {
            return Err(Error::InputTooLarge {
                len: bytes.len(),
                page_size: self.config.page_size,
            });
        }

        let marks = self.marks();
        match self.write_entry(hash, id, bytes) {
            Ok(node) => {
                self.total = id;
                Ok((node, StringId::new(id)))
            }
            Err(err) => {
                tracing::warn!(id, len = bytes.len(), error = %err, "intern rolled back");
                self.rewind(marks);
                Err(err)
            }
        }
    }

    /// Writes string bytes, hash record, and index node, in that order.
    fn write_entry(&mut self, hash: u32, id: u32, bytes: &[u8]) -> Result<NodeRef> {
        let string = self.strings.alloc(LEN_HEADER + bytes.len())?;
        let record = self.strings.slice_mut(string, LEN_HEADER + bytes.len());
        record[..LEN_HEADER].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        record[LEN_HEADER..].copy_from_slice(bytes);

        let slot = self.hashes.alloc(HASH_SIZE)?;
        self.hashes
            .slice_mut(slot, HASH_SIZE)
            .copy_from_slice(&hash.to_le_bytes());

        let at = self.nodes.alloc(NODE_SIZE)?;
        let node = IndexNode { hash, id, string, next: None };
        self.nodes.slice_mut(at, NODE_SIZE).copy_from_slice(&node.encode());

        Ok(NodeRef(at))
    }

    fn marks(&self) -> Marks {
        Marks {
            strings: self.strings.snapshot(),
            hashes: self.hashes.snapshot(),
            nodes: self.nodes.snapshot(),
        }
    }

    /// Rewinds the arenas to marks taken during the current operation.
    fn rewind(&mut self, marks: Marks) {
        // Marks from the current operation always describe an earlier
        // position of the same arenas.
        let strings = self.strings.restore(marks.strings);
        let hashes = self.hashes.restore(marks.hashes);
        let nodes = self.nodes.restore(marks.nodes);
        debug_assert!(strings.is_ok() && hashes.is_ok() && nodes.is_ok());
    }

    fn read_node(&self, at: NodeRef) -> IndexNode {
        IndexNode::decode(self.nodes.slice(at.0, NODE_SIZE))
    }

    fn set_next(&mut self, at: NodeRef, next: Option<NodeRef>) {
        let link = ArenaRef::new(at.0.page(), at.0.offset() + NEXT_OFFSET as u32);
        self.nodes
            .slice_mut(link, 8)
            .copy_from_slice(&IndexNode::encode_next(next));
    }

    /// Returns the bytes of the string record at `at`.
    fn string_at(&self, at: ArenaRef) -> &[u8] {
        let header = self.strings.slice(at, LEN_HEADER);
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let body = ArenaRef::new(at.page(), at.offset() + LEN_HEADER as u32);
        self.strings.slice(body, len)
    }

    /// Returns the recorded hash of stored ID `id` (1-based).
    fn hash_of(&self, id: u32) -> u32 {
        let per_page = self.config.page_size / HASH_SIZE;
        let slot = (id - 1) as usize;
        let at = ArenaRef::new(
            (slot / per_page) as u32,
            ((slot % per_page) * HASH_SIZE) as u32,
        );
        let bytes = self.hashes.slice(at, HASH_SIZE);
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Records the current position of the table.
    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        let marks = self.marks();
        TableSnapshot {
            table: self.table_id,
            generation: self.generation,
            strings: marks.strings,
            hashes: marks.hashes,
            nodes: marks.nodes,
            total: self.total,
        }
    }

    /// Rewinds the table to `snapshot`.
    ///
    /// Every entry created after the snapshot ceases to exist and its ID
    /// becomes unresolvable; IDs are handed out again from `snapshot.count()
    /// + 1`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSnapshot`] if the snapshot belongs to another table,
    /// describes a later state than the current one, or is stale: an earlier
    /// restore discarded some of the entries it covers. The table is
    /// unchanged on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtab::{Error, StringTable, TableConfig};
    ///
    /// let mut table = StringTable::new(TableConfig::default()).unwrap();
    /// table.intern("a").unwrap();
    /// let early = table.snapshot();
    /// table.intern("b").unwrap();
    /// let late = table.snapshot();
    ///
    /// table.restore(&early).unwrap();
    /// table.intern("c").unwrap();
    /// table.intern("d").unwrap();
    ///
    /// // "b" is gone, so `late` no longer describes this table.
    /// assert!(matches!(table.restore(&late), Err(Error::InvalidSnapshot(_))));
    /// table.restore(&early).unwrap();
    /// assert_eq!(table.count(), 1);
    /// ```
    pub fn restore(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        if let Err(err) = self.check_snapshot(snapshot) {
            tracing::warn!(error = %err, "restore rejected");
            return Err(err);
        }
        if snapshot.same_position(&self.snapshot()) {
            return Ok(());
        }

        let before = self.total;
        self.strings.restore(snapshot.strings)?;
        self.hashes.restore(snapshot.hashes)?;
        self.nodes.restore(snapshot.nodes)?;
        self.total = snapshot.total;
        self.record_floor(snapshot.total);
        self.rebuild_index();

        tracing::debug!(before, after = self.total, chains = self.index.len(), "table restored");
        Ok(())
    }

    fn check_snapshot(&self, snapshot: &TableSnapshot) -> Result<()> {
        if snapshot.table != self.table_id {
            return Err(Error::InvalidSnapshot("snapshot belongs to another table"));
        }
        if snapshot.total > self.total {
            return Err(Error::InvalidSnapshot("snapshot has more entries than the table"));
        }
        if snapshot.generation > self.generation {
            return Err(Error::InvalidSnapshot("snapshot is from a later generation"));
        }
        if let Some(floor) = self.floor_since(snapshot.generation)
            && snapshot.total > floor
        {
            return Err(Error::InvalidSnapshot("snapshot covers entries discarded by a restore"));
        }
        self.strings.validate(snapshot.strings)?;
        self.hashes.validate(snapshot.hashes)?;
        self.nodes.validate(snapshot.nodes)
    }

    /// Lowest total restored to since `generation`, if any restore happened
    /// since.
    fn floor_since(&self, generation: u64) -> Option<u32> {
        let first = self.floors.partition_point(|&(g, _)| g < generation);
        self.floors.get(first).map(|&(_, total)| total)
    }

    /// Records a truncating restore to `total` and starts a new generation.
    fn record_floor(&mut self, total: u32) {
        while self.floors.last().is_some_and(|&(_, t)| t >= total) {
            self.floors.pop();
        }
        self.floors.push((self.generation, total));
        self.generation += 1;
    }

    /// Rebuilds the index by replaying surviving nodes in creation order.
    fn rebuild_index(&mut self) {
        self.index.clear();

        for page in 0..self.nodes.page_count() {
            let used = self.nodes.page_bytes(page).map_or(0, <[u8]>::len);
            for offset in (0..used).step_by(NODE_SIZE) {
                let at = NodeRef(ArenaRef::new(page as u32, offset as u32));
                // Links may point past the restored position.
                self.set_next(at, None);

                let hash = self.read_node(at).hash;
                match self.index.search(hash) {
                    None => {
                        self.index.insert(hash, at);
                    }
                    Some(head) => {
                        let tail = self.chain_tail(head);
                        self.set_next(tail, Some(at));
                    }
                }
            }
        }
    }

    fn chain_tail(&self, head: NodeRef) -> NodeRef {
        let mut at = head;
        while let Some(next) = self.read_node(at).next {
            at = next;
        }
        at
    }

    /// Returns the string arena, for sequential readers.
    pub(crate) fn string_arena(&self) -> &PageArena<P> {
        &self.strings
    }

    /// Returns per-arena capacity statistics.
    #[must_use]
    pub fn arena_stats(&self) -> TableStats {
        TableStats {
            strings: self.strings.stats(),
            hashes: self.hashes.stats(),
            nodes: self.nodes.stats(),
        }
    }

    /// Returns the bytes held by the table: every arena page plus the table
    /// itself.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.arena_stats().total().bytes_allocated + std::mem::size_of::<Self>()
    }
}

impl<P: PageProvider> std::fmt::Debug for StringTable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTable")
            .field("count", &self.total)
            .field("chains", &self.index.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
