//! Object Accessor - size and reference flags of a live object
//!
//! Reads the type descriptor pointer at the object address, then the base
//! size, component size and flags of that type. Strings and arrays add
//! `component count * component size`, where the count is the 32-bit word
//! right after the type descriptor pointer.

use super::header::{MethodTable, ObjectModel, TypeHandle};
use super::layout::DescriptorError;
use crate::error::{FrzError, Result};
use crate::util::{Alignment, POINTER_SIZE};

/// Identity of an object in the source heap (its address)
///
/// Stable only while the heap is quiescent; used as a map key and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    #[inline]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Read the object's type descriptor pointer
    ///
    /// # Safety
    ///
    /// `self` must address a live object in a quiescent heap.
    pub unsafe fn type_handle(self) -> Result<TypeHandle> {
        if self.0 == 0 || !Alignment::is_aligned(self.0, POINTER_SIZE) {
            return Err(FrzError::InvalidPointer { address: self.0 });
        }
        Ok(TypeHandle::from_addr(*(self.0 as *const usize)))
    }

    /// Read the component count stored after the type descriptor pointer
    ///
    /// # Safety
    ///
    /// `self` must address a live string or array.
    pub unsafe fn num_components(self) -> u32 {
        ((self.0 + POINTER_SIZE) as *const u32).read_unaligned()
    }
}

/// Computes object sizes under an [`ObjectModel`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectAccessor {
    model: ObjectModel,
}

impl ObjectAccessor {
    pub const fn new(model: ObjectModel) -> Self {
        Self { model }
    }

    pub const fn model(&self) -> &ObjectModel {
        &self.model
    }

    /// Size of an instance of `method_table` with `components` components,
    /// raised to the minimum object size
    pub fn instance_size(
        &self,
        method_table: &MethodTable,
        components: u32,
    ) -> std::result::Result<usize, DescriptorError> {
        let mut size = method_table.base_size() as usize;
        if method_table.has_component_size() {
            size = (components as usize)
                .checked_mul(method_table.component_size() as usize)
                .and_then(|extra| extra.checked_add(size))
                .ok_or(DescriptorError::Overflow {
                    what: "instance size",
                    object: 0,
                })?;
        }
        Ok(self.model.instance_size(size))
    }

    /// Total byte size of the object, header included
    ///
    /// # Safety
    ///
    /// `object` must address a live object in a quiescent heap.
    pub unsafe fn size_of(&self, object: ObjectId) -> Result<usize> {
        let method_table = object.type_handle()?.method_table()?;
        let components = if method_table.has_component_size() {
            object.num_components()
        } else {
            0
        };

        self.instance_size(method_table, components).map_err(|err| match err {
            DescriptorError::Overflow { what, .. } => DescriptorError::Overflow {
                what,
                object: object.addr(),
            }
            .into(),
            other => other.into(),
        })
    }

    /// Whether the object has to be scanned for references
    ///
    /// # Safety
    ///
    /// `object` must address a live object in a quiescent heap.
    pub unsafe fn contains_references(&self, object: ObjectId) -> Result<bool> {
        let method_table = object.type_handle()?.method_table()?;
        Ok(method_table.contains_pointers_or_collectible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::header::{
        CATEGORY_ARRAY, FLAG_CONTAINS_POINTERS, FLAG_HAS_COMPONENT_SIZE, MIN_OBJECT_SIZE,
    };

    const W: usize = POINTER_SIZE;

    /// Object words: [header][MethodTable*][payload...]
    fn object_words(method_table: &MethodTable, payload: &[usize]) -> Vec<usize> {
        let mut words = vec![0, method_table as *const MethodTable as usize];
        words.extend_from_slice(payload);
        words
    }

    #[test]
    fn test_size_of_plain_object() {
        let method_table = MethodTable::new(0, (4 * W) as u32);
        let words = object_words(&method_table, &[1, 2]);
        let object = ObjectId::from_addr(&words[1] as *const usize as usize);

        let accessor = ObjectAccessor::default();
        unsafe {
            assert_eq!(accessor.size_of(object).unwrap(), 4 * W);
            assert!(!accessor.contains_references(object).unwrap());
        }
    }

    #[test]
    fn test_size_of_array_adds_components() {
        let method_table = MethodTable::new(
            FLAG_HAS_COMPONENT_SIZE | CATEGORY_ARRAY | FLAG_CONTAINS_POINTERS | W as u32,
            (3 * W) as u32,
        );
        let words = object_words(&method_table, &[5, 0, 0, 0, 0, 0]);
        let object = ObjectId::from_addr(&words[1] as *const usize as usize);

        let accessor = ObjectAccessor::default();
        unsafe {
            assert_eq!(object.num_components(), 5);
            assert_eq!(accessor.size_of(object).unwrap(), 3 * W + 5 * W);
            assert!(accessor.contains_references(object).unwrap());
        }
    }

    #[test]
    fn test_size_of_raised_to_minimum() {
        let method_table = MethodTable::new(0, W as u32);
        let words = object_words(&method_table, &[0]);
        let object = ObjectId::from_addr(&words[1] as *const usize as usize);

        let size = unsafe { ObjectAccessor::default().size_of(object).unwrap() };
        assert_eq!(size, MIN_OBJECT_SIZE);
    }

    #[test]
    fn test_null_object_rejected() {
        let result = unsafe { ObjectAccessor::default().size_of(ObjectId::from_addr(0)) };
        assert!(matches!(result, Err(FrzError::InvalidPointer { address: 0 })));
    }
}
