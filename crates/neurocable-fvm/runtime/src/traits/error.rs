// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for runtime operations

/// Runtime errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Arena would outgrow the 32-bit pointer range
    #[error("Capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Requested element count
        requested: usize,
        /// Largest addressable element count
        available: usize,
    },

    /// Access past the end of a device array
    #[error("Out of range: {len} elements at offset {offset} in array of length {array_len}")]
    OutOfRange {
        /// First element accessed
        offset: usize,
        /// Number of elements accessed
        len: usize,
        /// Length of the array
        array_len: usize,
    },

    /// Device-side failure (buffer mapping, submission)
    #[error("Device error: {0}")]
    Device(String),

    /// Requested backend is not available on this machine or build
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl RuntimeError {
    /// `Ok` if `[offset, offset + len)` lies within `array_len`
    pub fn check_range(offset: usize, len: usize, array_len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= array_len => Ok(()),
            _ => Err(RuntimeError::OutOfRange {
                offset,
                len,
                array_len,
            }),
        }
    }
}

/// Result type for runtime operations
pub type Result<T> = core::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(RuntimeError::check_range(0, 4, 4).is_ok());
        assert!(RuntimeError::check_range(4, 0, 4).is_ok());
        assert_eq!(
            RuntimeError::check_range(2, 3, 4),
            Err(RuntimeError::OutOfRange {
                offset: 2,
                len: 3,
                array_len: 4
            })
        );
        assert!(RuntimeError::check_range(usize::MAX, 2, 4).is_err());
    }
}
