//! Util Module - Shared Utilities

pub mod alignment;

pub use alignment::Alignment;

/// Format an address the way trace and error output print it
pub fn format_address(address: usize) -> String {
    format!("0x{:016X}", address)
}

/// Native pointer width in bytes
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Read a native-endian `usize` from `bytes` at `offset`
///
/// Returns `None` when the word does not fit.
#[inline]
pub(crate) fn read_word(bytes: &[u8], offset: usize) -> Option<usize> {
    let end = offset.checked_add(POINTER_SIZE)?;
    let raw = bytes.get(offset..end)?;
    let mut word = [0u8; POINTER_SIZE];
    word.copy_from_slice(raw);
    Some(usize::from_ne_bytes(word))
}

/// Read a native-endian `u32` from `bytes` at `offset`
#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let raw = bytes.get(offset..end)?;
    Some(u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
