//! Frz Runtime Library
//!
//! C ABI over the frz serializer for hosting runtimes:
//! - `frz_serialize_object` freezes the graph under one root into a file
//! - `frz_cleanup` releases the side tables it handed out

mod ffi;

pub use ffi::*;
