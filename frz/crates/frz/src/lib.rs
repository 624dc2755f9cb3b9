//! # FRZ - Frozen Object Graph Serializer
//!
//! FRZ writes the object graph reachable from one root object of a live,
//! quiescent managed heap into a relocatable blob. A loader can map the blob
//! as a read-only ("frozen") heap segment: every internal reference has been
//! rewritten from a memory address into a file offset.
//!
//! ## Overview
//!
//! - **Layout descriptors**: reference fields are found by decoding the
//!   compact series descriptor the runtime stores in front of each type
//!   descriptor
//! - **Breadth-first traversal**: objects are written in discovery order,
//!   with disk space reserved as soon as an object is discovered
//! - **Forward patches**: references are patched in place immediately, even
//!   when the target has not been written yet
//! - **Type tokens**: type descriptor pointers are replaced by dense tokens,
//!   returned in a side table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frz::{ObjectId, Serializer, SerializerConfig};
//!
//! fn freeze(root: usize) -> frz::Result<()> {
//!     let serializer = Serializer::new(SerializerConfig::default())?;
//!     // The heap must not move or mutate for the duration of the call
//!     let graph = unsafe { serializer.serialize(ObjectId::from_addr(root), "heap.frz", None)? };
//!
//!     for entry in graph.type_tokens() {
//!         println!("token {} = type {:#x}", entry.token, entry.type_handle.addr());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!  root ───▶ │ Serializer (queue, offsets,  │ ───▶ blob file
//!            │ tokens, fixups)              │
//!            └──────┬───────────────▲───────┘
//!                   │ object, size  │ reference slots
//!                   ▼               │
//!            ┌──────────────┐ ┌─────┴────────┐
//!            │ Object       │ │ Graph Walker │
//!            │ Accessor     │ │ (layout      │
//!            └──────────────┘ │ descriptors) │
//!                             └──────────────┘
//! ```
//!
//! ## Object Model
//!
//! The crate is pinned to one object-model convention,
//! [`ObjectModel::NATIVE`]: pointer width `W` of the build, object header of
//! `W` bytes before the type descriptor pointer, minimum object size `3W`
//! and `W` alignment. Blobs carry no description of the convention.
//!
//! ## Safety
//!
//! Reading a heap by raw address is inherently unsafe. Callers of the
//! serializing functions guarantee:
//!
//! 1. **Quiescent heap**: no mutation, relocation or collection during the call
//! 2. **Valid root**: the root addresses a live object
//! 3. **Matching convention**: type and layout descriptors follow [`ObjectModel::NATIVE`]
//!
//! Malformed descriptors are reported as [`FrzError::Descriptor`] instead of
//! reading outside the object.

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("frz supports 32-bit and 64-bit targets only");

pub mod config;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod object;
pub mod serializer;
pub mod util;
pub mod walker;

pub use config::{ConfigError, SerializerConfig};
pub use error::{FrzError, Result};
pub use inspect::{BlobInspector, BlobSummary, RecordInfo};
pub use logging::{JsonTraceSink, LogTraceSink, MemoryTraceSink, TraceEvent, TraceSink};
pub use object::{
    DescriptorError, LayoutDescriptor, MethodTable, ObjectAccessor, ObjectId, ObjectModel,
    TypeHandle,
};
pub use serializer::{SerializeStats, SerializedGraph, Serializer, TypeToken};
pub use walker::GraphWalker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serialize the graph under `root` into `path`
///
/// Uses [`SerializerConfig::from_env`]. Objects whose type is
/// `function_pointer_type` are listed in the fixups of the result.
///
/// # Safety
///
/// `root` must address a live object of a quiescent heap whose descriptors
/// follow [`ObjectModel::NATIVE`].
pub unsafe fn serialize(
    root: ObjectId,
    path: impl AsRef<std::path::Path>,
    function_pointer_type: Option<TypeHandle>,
) -> Result<SerializedGraph> {
    Serializer::new(SerializerConfig::from_env())?.serialize(root, path, function_pointer_type)
}
