//! Graph Walker - Reports the reference fields of one object
//!
//! The walker is responsible for:
//! - Finding the layout descriptor stored right before a type descriptor
//! - Decoding it (once per type, then served from a cache)
//! - Reporting every reference slot of an object to a callback
//!
//! # Descriptor Lookup
//!
//! ```text
//!            len = (1 + 2 * |count|) * W
//!  ┌──────────────────────────────────────────┐
//!  │ series ...                  │ count (i32)│ MethodTable
//!  └──────────────────────────────────────────┘ ▲
//!                                               └── TypeHandle
//! ```
//!
//! No state about objects is kept between calls; the cache only holds
//! decoded descriptors, which are immutable for the lifetime of the heap.

use crate::error::{FrzError, Result};
use crate::object::layout::descriptor_len;
use crate::object::{LayoutDescriptor, ObjectAccessor, ObjectExtent, ObjectId, TypeHandle};
use crate::util::POINTER_SIZE;
use rustc_hash::FxHashMap;

/// Layout cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Walks objects using their runtime layout descriptors
#[derive(Debug, Default)]
pub struct GraphWalker {
    accessor: ObjectAccessor,
    layouts: FxHashMap<TypeHandle, LayoutDescriptor>,
    hits: u64,
    misses: u64,
}

impl GraphWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded layout descriptor of `type_handle`
    ///
    /// # Safety
    ///
    /// `type_handle` must point at a live type descriptor with a layout
    /// descriptor in front of it.
    pub unsafe fn layout_of(&mut self, type_handle: TypeHandle) -> Result<&LayoutDescriptor> {
        if self.layouts.contains_key(&type_handle) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let descriptor = read_layout_descriptor(type_handle)?;
            log::trace!(
                "decoded layout of type {:#x}: {} series",
                type_handle.addr(),
                descriptor.len()
            );
            self.layouts.insert(type_handle, descriptor);
        }

        self.layouts
            .get(&type_handle)
            .ok_or_else(|| FrzError::Internal("layout cache lost an entry".to_string()))
    }

    /// Report every reference slot of `object` to `visit`
    ///
    /// `size` is the object's total size as computed by the object accessor.
    /// `visit` receives the object and the slot address. Types flagged as
    /// holding neither pointers nor collectible data are not scanned.
    ///
    /// # Safety
    ///
    /// `object` must address a live object of `size` bytes in a quiescent
    /// heap.
    pub unsafe fn walk<F>(&mut self, object: ObjectId, size: usize, mut visit: F) -> Result<()>
    where
        F: FnMut(ObjectId, usize) -> Result<()>,
    {
        if !self.accessor.contains_references(object)? {
            return Ok(());
        }

        let type_handle = object.type_handle()?;
        let descriptor = self.layout_of(type_handle)?;
        descriptor.for_each_reference(ObjectExtent::new(object.addr(), size), |slot| {
            visit(object, slot)
        })
    }

    pub fn stats(&self) -> LayoutCacheStats {
        LayoutCacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.layouts.len(),
        }
    }
}

/// Locate and decode the layout descriptor in front of a type descriptor
///
/// # Safety
///
/// `type_handle` must point at a live type descriptor with a layout
/// descriptor in front of it.
pub unsafe fn read_layout_descriptor(type_handle: TypeHandle) -> Result<LayoutDescriptor> {
    let method_table = type_handle.addr();
    let count_addr = method_table
        .checked_sub(POINTER_SIZE)
        .filter(|_| method_table != 0)
        .ok_or(FrzError::InvalidPointer {
            address: method_table,
        })?;

    let count = (count_addr as *const u32).read_unaligned() as i32;
    let len = descriptor_len(count).ok_or(FrzError::InvalidPointer {
        address: method_table,
    })?;
    let start = method_table
        .checked_sub(len)
        .ok_or(FrzError::InvalidPointer {
            address: method_table,
        })?;

    let bytes = std::slice::from_raw_parts(start as *const u8, len);
    Ok(LayoutDescriptor::parse(bytes)?)
}
