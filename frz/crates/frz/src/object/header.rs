//! Object Header - The hosting runtime's object-model convention
//!
//! Object layout (address `A` points at the type descriptor slot):
//! ```text
//!  A - W          A              A + W                     A - W + size
//!  ┌──────────────┬──────────────┬─────────────────────────┐
//!  │ Object header│ MethodTable* │ fields / component count│
//!  │  (W bytes)   │  (W bytes)   │  ...                    │
//!  └──────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! Type descriptor layout (`MethodTable*` points at `flags`):
//! ```text
//!  ┌──────────────────────────────┬─────────────┬────────────┬───────────┐
//!  │ layout descriptor series ... │ series count│ flags (u32)│ base size │
//!  │                              │  (W bytes)  │            │   (u32)   │
//!  └──────────────────────────────┴─────────────┴────────────┴───────────┘
//! ```
//!
//! The flag bits and sizes below are an external contract: the produced blob
//! is only a valid heap segment for a runtime using the same convention.

use crate::error::{FrzError, Result};
use crate::util::{Alignment, POINTER_SIZE};

/// Size of the object header that precedes the type descriptor slot
pub const OBJECT_HEADER_SIZE: usize = POINTER_SIZE;

/// Smallest instance any object may occupy
pub const MIN_OBJECT_SIZE: usize = 2 * POINTER_SIZE + OBJECT_HEADER_SIZE;

/// Alignment of every object and every blob record
pub const OBJECT_ALIGNMENT: usize = POINTER_SIZE;

/// Low word of the flags holds the component size
pub const COMPONENT_SIZE_MASK: u32 = 0x0000_FFFF;
pub const CATEGORY_ARRAY_MASK: u32 = 0x000C_0000;
pub const CATEGORY_ARRAY: u32 = 0x0008_0000;
pub const FLAG_CONTAINS_POINTERS: u32 = 0x0100_0000;
pub const FLAG_COLLECTIBLE: u32 = 0x1000_0000;
pub const FLAG_HAS_COMPONENT_SIZE: u32 = 0x8000_0000;

/// Pinned object-model convention
///
/// Not configurable: a blob written under any other numbers would not load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectModel {
    /// Convention tag, for diagnostics
    pub name: &'static str,
    pub pointer_size: usize,
    pub header_size: usize,
    pub min_object_size: usize,
    pub alignment: usize,
}

impl ObjectModel {
    /// The convention of the producing process
    pub const NATIVE: ObjectModel = ObjectModel {
        name: "coreclr-methodtable-v1",
        pointer_size: POINTER_SIZE,
        header_size: OBJECT_HEADER_SIZE,
        min_object_size: MIN_OBJECT_SIZE,
        alignment: OBJECT_ALIGNMENT,
    };

    /// Raise a raw instance size to the minimum object size
    #[inline]
    pub const fn instance_size(&self, raw_size: usize) -> usize {
        if raw_size < self.min_object_size {
            self.min_object_size
        } else {
            raw_size
        }
    }

    /// Zero padding written after an object of `size` bytes
    #[inline]
    pub const fn padding(&self, size: usize) -> usize {
        Alignment::padding(size, self.alignment)
    }

    /// Bytes a record of an object of `size` bytes occupies on disk
    #[inline]
    pub const fn record_extent(&self, size: usize) -> usize {
        size + self.padding(size)
    }
}

impl Default for ObjectModel {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// Type descriptor, as laid out by the hosting runtime
///
/// Only the two leading words are read; the rest of the runtime's
/// method table is opaque.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodTable {
    flags: u32,
    base_size: u32,
}

impl MethodTable {
    pub const fn new(flags: u32, base_size: u32) -> Self {
        Self { flags, base_size }
    }

    #[inline]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Instance size without components, header included
    #[inline]
    pub const fn base_size(&self) -> u32 {
        self.base_size
    }

    /// Strings and arrays carry a component count
    #[inline]
    pub const fn has_component_size(&self) -> bool {
        self.flags & FLAG_HAS_COMPONENT_SIZE != 0
    }

    /// Component size; returns 0 if this type has no components
    #[inline]
    pub const fn component_size(&self) -> u16 {
        if self.has_component_size() {
            (self.flags & COMPONENT_SIZE_MASK) as u16
        } else {
            0
        }
    }

    #[inline]
    pub const fn is_array(&self) -> bool {
        self.flags & CATEGORY_ARRAY_MASK == CATEGORY_ARRAY
    }

    #[inline]
    pub const fn is_string(&self) -> bool {
        self.has_component_size() && !self.is_array() && self.component_size() == 2
    }

    #[inline]
    pub const fn contains_pointers(&self) -> bool {
        self.flags & FLAG_CONTAINS_POINTERS != 0
    }

    #[inline]
    pub const fn collectible(&self) -> bool {
        self.flags & FLAG_COLLECTIBLE != 0
    }

    /// Whether instances have to be scanned for references
    #[inline]
    pub const fn contains_pointers_or_collectible(&self) -> bool {
        self.contains_pointers() || self.collectible()
    }
}

/// Opaque handle to a type descriptor (its address)
///
/// Only ever looked up, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(usize);

impl TypeHandle {
    #[inline]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Borrow the type descriptor behind this handle
    ///
    /// # Safety
    ///
    /// The handle must point at a live `MethodTable` that stays valid and
    /// unmodified for `'a`.
    pub unsafe fn method_table<'a>(self) -> Result<&'a MethodTable> {
        if self.0 == 0 || self.0 % std::mem::align_of::<MethodTable>() != 0 {
            return Err(FrzError::InvalidPointer { address: self.0 });
        }
        Ok(&*(self.0 as *const MethodTable))
    }
}
