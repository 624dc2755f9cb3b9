//! Identity Map - source address to reserved disk offset
//!
//! Disk space is reserved when an object is first discovered, long before
//! its record is written. The map value is the offset a reference to the
//! object must hold: the record start plus one word, which is the token
//! field.
//!
//! ```text
//!  next_free ─┐
//!             ▼
//!  ┌──────────┬──────────┬─────────────────┐
//!  │ record 0 │ record 1 │ (reserved) ...  │
//!  └──────────┴──────────┴─────────────────┘
//!   ▲ root: offset W
//! ```

use crate::object::{ObjectId, ObjectModel};
use rustc_hash::FxHashMap;

/// Identity → offset map with a running reservation cursor
#[derive(Debug)]
pub struct IdentityOffsetMap {
    offsets: FxHashMap<ObjectId, usize>,
    next_free: usize,
    model: ObjectModel,
}

impl IdentityOffsetMap {
    pub fn new(model: ObjectModel, capacity: usize) -> Self {
        let mut offsets = FxHashMap::default();
        offsets.reserve(capacity);
        Self {
            offsets,
            next_free: 0,
            model,
        }
    }

    /// Reserved token offset of `object`, if already discovered
    #[inline]
    pub fn get(&self, object: ObjectId) -> Option<usize> {
        self.offsets.get(&object).copied()
    }

    /// Reserve the next record for a newly discovered object
    ///
    /// Returns the token offset. Reserving an object twice returns its
    /// first reservation and does not move the cursor.
    pub fn reserve(&mut self, object: ObjectId, size: usize) -> usize {
        if let Some(offset) = self.get(object) {
            return offset;
        }

        let offset = self.next_free + self.model.header_size;
        self.next_free += self.model.record_extent(size);
        self.offsets.insert(object, offset);
        offset
    }

    /// End of the last reserved record
    pub fn next_free(&self) -> usize {
        self.next_free
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
