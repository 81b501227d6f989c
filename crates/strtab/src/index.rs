//! Hash index over collision chains.
//!
//! The index maps each distinct 32-bit hash to the head of a chain of index
//! nodes. Nodes live in the table's node arena; the index only stores
//! [`NodeRef`]s to chain heads. Appending to a chain is the caller's job.
//!
//! Because chains live entirely in the node arena, the index can be thrown
//! away and rebuilt by replaying the surviving nodes after a restore.

use std::collections::BTreeMap;

use crate::arena::ArenaRef;

/// Size of an encoded [`IndexNode`] in bytes.
pub(crate) const NODE_SIZE: usize = 24;

/// Page value marking an absent `next` link.
const NO_NEXT: u32 = u32::MAX;

/// Reference to an index node in the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(crate) ArenaRef);

/// One entry of a collision chain.
///
/// Encoded in the node arena as six little-endian `u32`s:
/// `hash, id, string.page, string.offset, next.page, next.offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexNode {
    pub hash: u32,
    pub id: u32,
    /// Location of the length-prefixed string record.
    pub string: ArenaRef,
    pub next: Option<NodeRef>,
}

impl IndexNode {
    pub fn encode(&self) -> [u8; NODE_SIZE] {
        let next = self.next.map_or(ArenaRef::new(NO_NEXT, 0), |n| n.0);
        let words = [
            self.hash,
            self.id,
            self.string.page(),
            self.string.offset(),
            next.page(),
            next.offset(),
        ];

        let mut out = [0u8; NODE_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let word = |i: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            u32::from_le_bytes(buf)
        };

        let next = match word(4) {
            NO_NEXT => None,
            page => Some(NodeRef(ArenaRef::new(page, word(5)))),
        };
        Self {
            hash: word(0),
            id: word(1),
            string: ArenaRef::new(word(2), word(3)),
            next,
        }
    }

    /// Encodes a `next` link on its own, for patching a stored node.
    pub fn encode_next(next: Option<NodeRef>) -> [u8; 8] {
        let next = next.map_or(ArenaRef::new(NO_NEXT, 0), |n| n.0);
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&next.page().to_le_bytes());
        out[4..].copy_from_slice(&next.offset().to_le_bytes());
        out
    }
}

/// Byte offset of the `next` link inside an encoded node.
pub(crate) const NEXT_OFFSET: usize = 16;

/// Ordered map from hash to chain head.
#[derive(Debug, Default)]
pub struct HashIndex {
    heads: BTreeMap<u32, NodeRef>,
}

impl HashIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chain head for `hash`.
    #[must_use]
    pub fn search(&self, hash: u32) -> Option<NodeRef> {
        self.heads.get(&hash).copied()
    }

    /// Installs `node` as the chain head for `hash`.
    ///
    /// Returns `false` and leaves the index unchanged if `hash` already has
    /// a chain.
    pub fn insert(&mut self, hash: u32, node: NodeRef) -> bool {
        match self.heads.entry(hash) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Returns true if the index holds no chains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Drops every chain head.
    pub fn clear(&mut self) {
        self.heads.clear();
    }
}
