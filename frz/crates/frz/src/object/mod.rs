//! Object Module - The hosting runtime's object model
//!
//! This module reads, but never defines, the runtime's type descriptors,
//! object headers and layout descriptors.

pub mod accessor;
pub mod header;
pub mod layout;

pub use accessor::{ObjectAccessor, ObjectId};
pub use header::{MethodTable, ObjectModel, TypeHandle};
pub use header::{MIN_OBJECT_SIZE, OBJECT_ALIGNMENT, OBJECT_HEADER_SIZE};
pub use layout::{
    DescriptorError, LayoutDescriptor, ObjectExtent, PatternGroup, RepeatingPattern, Series,
};
