//! Alignment Utilities
//!
//! Helper functions for record alignment.

/// Alignment - utility for alignment operations
///
/// All helpers require `alignment` to be a power of two.
pub struct Alignment;

impl Alignment {
    /// Align value up to boundary
    ///
    /// # Examples
    /// ```
    /// use frz::util::Alignment;
    ///
    /// assert_eq!(Alignment::align_up(100, 8), 104);
    /// assert_eq!(Alignment::align_up(64, 8), 64);
    /// ```
    #[inline]
    pub const fn align_up(value: usize, alignment: usize) -> usize {
        (value + alignment - 1) & !(alignment - 1)
    }

    /// Check if value is aligned
    #[inline]
    pub const fn is_aligned(value: usize, alignment: usize) -> bool {
        value & (alignment - 1) == 0
    }

    /// Zero bytes needed to bring `value` up to the next boundary
    ///
    /// Same result as the runtime's `(0 - value) & (alignment - 1)`.
    #[inline]
    pub const fn padding(value: usize, alignment: usize) -> usize {
        value.wrapping_neg() & (alignment - 1)
    }
}
