//! Configuration Module - Serializer Parameters
//!
//! Only I/O and diagnostics are tunable. The object-model convention
//! (pointer width, minimum object size, alignment) is pinned in
//! [`ObjectModel::NATIVE`](crate::object::ObjectModel::NATIVE) because a
//! blob written under any other numbers is not a valid heap segment.

use crate::util::POINTER_SIZE;
use std::path::PathBuf;

/// Main configuration for the serializer
///
/// # Examples
///
/// ```rust
/// use frz::SerializerConfig;
///
/// let config = SerializerConfig {
///     expected_objects: 100_000,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Size of the write buffer over the output file
    ///
    /// Every reference patch seeks, which flushes the buffer, so large
    /// values mostly help reference-free payloads.
    ///
    /// Default: 64KB
    pub buffer_capacity: usize,

    /// Capacity hint for the identity map and traversal queue
    ///
    /// Default: 1024
    pub expected_objects: usize,

    /// Write a JSON trace of every record and patch to this file
    ///
    /// Ignored when a trace sink is injected explicitly.
    /// Default: None
    pub trace_path: Option<PathBuf>,

    /// Log a summary of every run at info level
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig {
            buffer_capacity: 64 * KB,
            expected_objects: 1024,
            trace_path: None,
            verbose: false,
        }
    }
}

impl SerializerConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use frz::SerializerConfig;
    ///
    /// let config = SerializerConfig {
    ///     buffer_capacity: 0,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity < POINTER_SIZE {
            return Err(ConfigError::InvalidBufferCapacity(format!(
                "buffer_capacity must be at least {} bytes",
                POINTER_SIZE
            )));
        }

        if let Some(path) = &self.trace_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidTracePath(
                    "trace_path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - FRZ_BUFFER_SIZE
    /// - FRZ_EXPECTED_OBJECTS
    /// - FRZ_TRACE_FILE
    /// - FRZ_VERBOSE
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(size) = lookup("FRZ_BUFFER_SIZE").and_then(|val| val.parse().ok()) {
            config.buffer_capacity = size;
        }

        if let Some(count) = lookup("FRZ_EXPECTED_OBJECTS").and_then(|val| val.parse().ok()) {
            config.expected_objects = count;
        }

        if let Some(path) = lookup("FRZ_TRACE_FILE") {
            if !path.is_empty() {
                config.trace_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("FRZ_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid buffer capacity: {0}")]
    InvalidBufferCapacity(String),

    #[error("Invalid trace path: {0}")]
    InvalidTracePath(String),
}

const KB: usize = 1024;
