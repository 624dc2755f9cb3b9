//! Serializer FFI - C functions for the hosting runtime
//!
//! Side tables cross the boundary as (data pointer, opaque handle, count)
//! triples. The handle owns the storage; the caller passes both handles to
//! `frz_cleanup` exactly once.

use anyhow::{bail, Context};
use frz::{ObjectId, SerializedGraph, TypeHandle};
use libc::{c_char, c_void, size_t};
use std::ffi::CStr;
use std::ptr;

/// One entry of the type token table
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrzTypeToken {
    pub type_handle: *const c_void,
    pub token: size_t,
}

/// Serialize the object graph under `*root` into the file at `path`
///
/// `function_pointer_type` may be null. On success the token table and the
/// fixup list are written to the six out-parameters and true is returned.
/// On failure the error is logged, every out-parameter is nulled and false
/// is returned; a partially written file may remain at `path`.
///
/// # Safety
///
/// `root` must point at a reference to a live object of a quiescent heap.
/// `path` must be a NUL-terminated string. Every out-parameter must be
/// valid for writes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn frz_serialize_object(
    root: *const *const c_void,
    path: *const c_char,
    function_pointer_type: *const c_void,
    out_type_tokens: *mut *const FrzTypeToken,
    out_type_tokens_handle: *mut *mut c_void,
    out_type_tokens_count: *mut size_t,
    out_fixups: *mut *const size_t,
    out_fixups_handle: *mut *mut c_void,
    out_fixups_count: *mut size_t,
) -> bool {
    if out_type_tokens.is_null()
        || out_type_tokens_handle.is_null()
        || out_type_tokens_count.is_null()
        || out_fixups.is_null()
        || out_fixups_handle.is_null()
        || out_fixups_count.is_null()
    {
        log::error!("frz_serialize_object: null output parameter");
        return false;
    }

    out_type_tokens.write(ptr::null());
    out_type_tokens_handle.write(ptr::null_mut());
    out_type_tokens_count.write(0);
    out_fixups.write(ptr::null());
    out_fixups_handle.write(ptr::null_mut());
    out_fixups_count.write(0);

    let graph = match serialize_object(root, path, function_pointer_type) {
        Ok(graph) => graph,
        Err(e) => {
            log::error!("Failed to serialize object graph: {:#}", e);
            return false;
        },
    };

    let (type_tokens, fixups) = graph.into_parts();
    let type_tokens: Box<Vec<FrzTypeToken>> = Box::new(
        type_tokens
            .into_iter()
            .map(|entry| FrzTypeToken {
                type_handle: entry.type_handle.addr() as *const c_void,
                token: entry.token,
            })
            .collect(),
    );
    let fixups: Box<Vec<size_t>> = Box::new(fixups);

    out_type_tokens.write(type_tokens.as_ptr());
    out_type_tokens_count.write(type_tokens.len());
    out_type_tokens_handle.write(Box::into_raw(type_tokens) as *mut c_void);
    out_fixups.write(fixups.as_ptr());
    out_fixups_count.write(fixups.len());
    out_fixups_handle.write(Box::into_raw(fixups) as *mut c_void);
    true
}

unsafe fn serialize_object(
    root: *const *const c_void,
    path: *const c_char,
    function_pointer_type: *const c_void,
) -> anyhow::Result<SerializedGraph> {
    if root.is_null() {
        bail!("root handle is null");
    }
    if path.is_null() {
        bail!("output path is null");
    }

    let path = CStr::from_ptr(path)
        .to_str()
        .context("output path is not valid UTF-8")?;
    let root = ObjectId::from_addr(*root as usize);
    let function_pointer_type =
        (!function_pointer_type.is_null()).then(|| TypeHandle::from_addr(function_pointer_type as usize));

    let graph = frz::serialize(root, path, function_pointer_type)
        .with_context(|| format!("serializing graph of {:#x} to {}", root.addr(), path))?;
    log::debug!("frz_serialize_object: {}", graph.stats());
    Ok(graph)
}

/// Release the side tables returned by `frz_serialize_object`
///
/// Null handles are ignored.
///
/// # Safety
///
/// Each non-null handle must come from `frz_serialize_object` and must not
/// have been released before.
#[no_mangle]
pub unsafe extern "C" fn frz_cleanup(type_tokens_handle: *mut c_void, fixups_handle: *mut c_void) {
    if !type_tokens_handle.is_null() {
        drop(Box::from_raw(type_tokens_handle as *mut Vec<FrzTypeToken>));
    }
    if !fixups_handle.is_null() {
        drop(Box::from_raw(fixups_handle as *mut Vec<size_t>));
    }
}
