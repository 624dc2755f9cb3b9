//! Layout Descriptor - Tells the walker where reference fields live
//!
//! The descriptor is a blob of pointer-sized words sitting right before a
//! type descriptor. Its last word is a signed series count `N`:
//!
//! ```text
//! N >= 0: fixed series, highest first
//! ┌──────────────┬──────────────┬─────┬──────────────┬──────────────┬───┐
//! │ size_adjust  │ start_offset │ ... │ size_adjust  │ start_offset │ N │
//! │  (lowest)    │              │     │  (highest)   │              │   │
//! └──────────────┴──────────────┴─────┴──────────────┴──────────────┴───┘
//!
//! N < 0: one repeating pattern of |N| (pointers, skip) groups
//! ┌────────┬─────────────┬─────┬─────────────┬──────────────┬───┐
//! │ unused │ group |N|-1 │ ... │ group 0     │ start_offset │ N │
//! └────────┴─────────────┴─────┴─────────────┴──────────────┴───┘
//! ```
//!
//! A series covers every slot in
//! `[A + start_offset, A + start_offset + size + size_adjust)`, where `A` is
//! the object address and `size` its total size. A pattern group word packs
//! the pointer count in its low half and the skip (in bytes) in its high half.
//!
//! Decoding never reads the object; slots are reported by address and every
//! one is checked against the object's extent first.

use crate::util::{read_word, POINTER_SIZE};
use thiserror::Error;

const W: usize = POINTER_SIZE;

/// Errors decoding a layout descriptor against an object
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("layout descriptor length {len} is not a non-zero multiple of the pointer size")]
    MisalignedBlob { len: usize },

    #[error("layout descriptor declares {series} series needing {required} bytes, blob holds {len}")]
    TruncatedBlob {
        series: i32,
        required: usize,
        len: usize,
    },

    #[error("reference slot {slot:#x} lies outside object {object:#x} of size {size}")]
    SlotOutOfBounds {
        slot: usize,
        object: usize,
        size: usize,
    },

    #[error("overflow computing {what} for object {object:#x}")]
    Overflow { what: &'static str, object: usize },
}

/// One run of consecutive reference slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Series {
    /// Added to the object size to get the run length (usually negative)
    pub size_adjust: isize,
    /// Offset of the first slot from the object address
    pub start_offset: usize,
}

/// One group of a repeating pattern: `pointers` slots, then `skip` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternGroup {
    pub pointers: u32,
    pub skip: u32,
}

/// Per-element pattern for arrays of structs holding references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingPattern {
    pub start_offset: usize,
    pub groups: Vec<PatternGroup>,
}

/// Decoded layout descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutDescriptor {
    /// Fixed series, in decode order (highest first)
    Series(Vec<Series>),
    /// Repeating group pattern
    Repeating(RepeatingPattern),
}

/// Where an object lives in memory
///
/// `address` points at the type descriptor slot; the object header sits one
/// word before it, so the object spans `[address - W, address - W + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectExtent {
    pub address: usize,
    pub size: usize,
}

impl ObjectExtent {
    pub const fn new(address: usize, size: usize) -> Self {
        Self { address, size }
    }

    /// One past the last byte of the object
    fn end(&self) -> Result<usize, DescriptorError> {
        self.address
            .checked_add(self.size)
            .and_then(|end| end.checked_sub(W))
            .ok_or(DescriptorError::Overflow {
                what: "object end",
                object: self.address,
            })
    }

    /// A slot must lie after the type descriptor slot and end inside the object
    fn check_slot(&self, slot: usize) -> Result<(), DescriptorError> {
        let out_of_bounds = DescriptorError::SlotOutOfBounds {
            slot,
            object: self.address,
            size: self.size,
        };

        let lowest = self.address.checked_add(W).ok_or(out_of_bounds.clone())?;
        let slot_end = slot.checked_add(W).ok_or(out_of_bounds.clone())?;
        if slot < lowest || slot_end > self.end()? {
            return Err(out_of_bounds);
        }
        Ok(())
    }

    fn overflow(&self, what: &'static str) -> DescriptorError {
        DescriptorError::Overflow {
            what,
            object: self.address,
        }
    }
}

/// Half of a pattern group word, matching the runtime's `val_serie` item
#[cfg(target_pointer_width = "64")]
fn read_half(bytes: &[u8], offset: usize) -> Option<u32> {
    crate::util::read_u32(bytes, offset)
}

#[cfg(target_pointer_width = "32")]
fn read_half(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_ne_bytes([raw[0], raw[1]]) as u32)
}

/// Total descriptor length in bytes for a series count
///
/// One count word plus one pair of words per series; the sign of the count
/// does not change the length.
pub fn descriptor_len(series: i32) -> Option<usize> {
    (series.unsigned_abs() as usize)
        .checked_mul(2 * W)?
        .checked_add(W)
}

impl LayoutDescriptor {
    /// Parse a descriptor blob
    ///
    /// The blob must end exactly where the type descriptor begins.
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let len = bytes.len();
        if len == 0 || len % W != 0 {
            return Err(DescriptorError::MisalignedBlob { len });
        }

        // The runtime keeps the count in an int
        let count = read_word(bytes, len - W).ok_or(DescriptorError::MisalignedBlob { len })? as i32;
        let pairs = count.unsigned_abs() as usize;

        let required = descriptor_len(count).unwrap_or(usize::MAX);
        if required > len {
            return Err(DescriptorError::TruncatedBlob {
                series: count,
                required,
                len,
            });
        }

        let truncated = DescriptorError::TruncatedBlob {
            series: count,
            required,
            len,
        };

        if count >= 0 {
            let mut series = Vec::with_capacity(pairs);
            for index in 0..pairs {
                let at = len - 3 * W - index * 2 * W;
                let size_adjust = read_word(bytes, at).ok_or(truncated.clone())? as isize;
                let start_offset = read_word(bytes, at + W).ok_or(truncated.clone())?;
                series.push(Series {
                    size_adjust,
                    start_offset,
                });
            }
            return Ok(LayoutDescriptor::Series(series));
        }

        let highest = len - 3 * W;
        let start_offset = read_word(bytes, highest + W).ok_or(truncated.clone())?;
        let mut groups = Vec::with_capacity(pairs);
        for index in 0..pairs {
            let at = highest - index * W;
            groups.push(PatternGroup {
                pointers: read_half(bytes, at).ok_or(truncated.clone())?,
                skip: read_half(bytes, at + W / 2).ok_or(truncated.clone())?,
            });
        }

        Ok(LayoutDescriptor::Repeating(RepeatingPattern {
            start_offset,
            groups,
        }))
    }

    /// Report the address of every reference slot of `object`
    ///
    /// Slots are reported whatever they currently hold; callers skip nulls.
    /// Stops at the first error from `visit` or from the bounds check.
    pub fn for_each_reference<E, F>(&self, object: ObjectExtent, mut visit: F) -> Result<(), E>
    where
        E: From<DescriptorError>,
        F: FnMut(usize) -> Result<(), E>,
    {
        match self {
            LayoutDescriptor::Series(series) => walk_series(series, object, &mut visit),
            LayoutDescriptor::Repeating(pattern) => walk_repeating(pattern, object, &mut visit),
        }
    }

    /// Collect every reference slot of `object`
    pub fn reference_slots(&self, object: ObjectExtent) -> Result<Vec<usize>, DescriptorError> {
        let mut slots = Vec::new();
        self.for_each_reference(object, |slot| {
            slots.push(slot);
            Ok::<(), DescriptorError>(())
        })?;
        Ok(slots)
    }

    /// Number of series or pattern groups
    pub fn len(&self) -> usize {
        match self {
            LayoutDescriptor::Series(series) => series.len(),
            LayoutDescriptor::Repeating(pattern) => pattern.groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn walk_series<E, F>(series: &[Series], object: ObjectExtent, visit: &mut F) -> Result<(), E>
where
    E: From<DescriptorError>,
    F: FnMut(usize) -> Result<(), E>,
{
    for run in series {
        let begin = object
            .address
            .checked_add(run.start_offset)
            .ok_or(object.overflow("series start"))?;
        // Size first: the adjustment is negative and may exceed `begin`
        let stop = begin
            .checked_add(object.size)
            .and_then(|stop| stop.checked_add_signed(run.size_adjust))
            .ok_or(object.overflow("series end"))?;

        let mut slot = begin;
        while slot < stop {
            object.check_slot(slot)?;
            visit(slot)?;
            slot += W;
        }
    }
    Ok(())
}

/// Apply every group of the pattern in turn until the object end
///
/// The end is only checked between passes, and each group reports at least
/// one slot even when its pointer count is zero, as the runtime does.
fn walk_repeating<E, F>(pattern: &RepeatingPattern, object: ObjectExtent, visit: &mut F) -> Result<(), E>
where
    E: From<DescriptorError>,
    F: FnMut(usize) -> Result<(), E>,
{
    let end = object.end()?;
    let mut cursor = object
        .address
        .checked_add(pattern.start_offset)
        .ok_or(object.overflow("pattern start"))?;

    while cursor < end {
        for group in &pattern.groups {
            let stop = (group.pointers as usize)
                .checked_mul(W)
                .and_then(|run| cursor.checked_add(run))
                .ok_or(object.overflow("pattern run"))?;

            loop {
                object.check_slot(cursor)?;
                visit(cursor)?;
                cursor += W;
                if cursor >= stop {
                    break;
                }
            }

            cursor = cursor
                .checked_add(group.skip as usize)
                .ok_or(object.overflow("pattern skip"))?;
        }
    }
    Ok(())
}
