//! Error Module - Frz Error Types
//!
//! Defines all error types used by the serializer.
//!
//! # Error Categories
//!
//! ## Output Errors
//! - `Io` - Opening, writing, seeking or flushing the output file
//!
//! ## Heap Errors
//! - `Descriptor` - Malformed or inconsistent layout/type descriptor
//! - `InvalidPointer` - Null or misaligned object/type address
//!
//! ## Other
//! - `Configuration` - Invalid configuration
//! - `CorruptBlob` - Blob inspection found an inconsistent record
//! - `Internal` - Invariant violation inside the serializer
//!
//! Nothing here is retryable. The walk is a one-shot pass over a quiescent
//! heap, so a detected inconsistency means a precondition was violated.

use crate::config::ConfigError;
use crate::object::DescriptorError;
use thiserror::Error;

/// Main error type for all frz operations
///
/// # Examples
///
/// ```rust
/// use frz::FrzError;
///
/// fn describe(err: &FrzError) -> &'static str {
///     match err {
///         FrzError::Io { .. } => "output file",
///         FrzError::Descriptor(_) => "heap descriptors",
///         _ => "other",
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum FrzError {
    /// I/O failure on the output blob or trace file
    ///
    /// **When returned:** create/write/seek/flush failed
    ///
    /// **Recovery strategy:** none; the caller discards the partial file
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Layout or type descriptor does not describe the object
    ///
    /// **When returned:** a reference slot falls outside the object's extent,
    /// or the descriptor blob is truncated/misaligned
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Invalid pointer address
    ///
    /// **When returned:** null root, or a null/misaligned type descriptor
    #[error("Invalid pointer address: {address:#x}")]
    InvalidPointer { address: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Blob inspection found an inconsistent record
    #[error("Corrupt blob at offset {offset}: {reason}")]
    CorruptBlob { offset: usize, reason: String },

    /// Internal error - indicates a bug in frz
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FrzError {
    /// Wrap an I/O error with what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FrzError::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if this error came from the output side
    pub fn is_io(&self) -> bool {
        matches!(self, FrzError::Io { .. })
    }

    /// Check if this error means the heap broke the serializer's preconditions
    ///
    /// Either the heap was mutated mid-walk or the descriptor convention
    /// does not match the one this crate is pinned to.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            FrzError::Descriptor(_) | FrzError::InvalidPointer { .. }
        )
    }
}

/// Result type alias for frz operations
pub type Result<T> = std::result::Result<T, FrzError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_carries_context() {
        let err = FrzError::io(
            "creating blob",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_io());
        assert!(!err.is_precondition_violation());
        assert!(err.to_string().contains("creating blob"));
    }

    #[test]
    fn test_descriptor_error_is_precondition_violation() {
        let err: FrzError = DescriptorError::MisalignedBlob { len: 3 }.into();
        assert!(err.is_precondition_violation());
        assert!(!err.is_io());
    }
}
