// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity and pointer types shared by every backend
//!
//! A "pointer" is an element offset into one of the three arenas a cell group
//! owns (values, indices, pointer tables). Offsets stay valid when the backing
//! device buffer is re-allocated, so a parameter pack handed to a kernel once
//! stays usable for every step.

use bytemuck::{Pod, Zeroable};
use core::fmt;

/// Numeric type of every mechanism field, shared-state array and global
pub type Value = f32;

/// Compartment / ion index type
pub type Index = i32;

/// Identifier of a mechanism instance within one cell group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MechanismId(pub u32);

impl fmt::Display for MechanismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mechanism({})", self.0)
    }
}

macro_rules! arena_ptr {
    ($(#[$doc:meta])* $name:ident, $arena:literal) => {
        $(#[$doc])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
        pub struct $name(pub u32);

        impl $name {
            /// Null pointer sentinel (no storage behind it)
            pub const NULL: Self = Self(u32::MAX);

            /// Pointer to element `offset` of the arena
            #[inline]
            pub fn at(offset: usize) -> Self {
                debug_assert!(offset < u32::MAX as usize);
                Self(offset as u32)
            }

            #[inline]
            pub fn is_null(self) -> bool {
                self.0 == u32::MAX
            }

            /// Element offset, `None` for the null pointer
            #[inline]
            pub fn offset(self) -> Option<usize> {
                if self.is_null() {
                    None
                } else {
                    Some(self.0 as usize)
                }
            }

            /// Pointer advanced by `n` elements (null stays null)
            #[inline]
            pub fn add(self, n: usize) -> Self {
                if self.is_null() {
                    self
                } else {
                    Self::at(self.0 as usize + n)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_null() {
                    write!(f, "{}(null)", stringify!($name))
                } else {
                    write!(f, "{}({}+{})", stringify!($name), $arena, self.0)
                }
            }
        }
    };
}

arena_ptr!(
    /// Offset into the value arena (`f32`)
    ValuePtr,
    "values"
);
arena_ptr!(
    /// Offset into the index arena (`i32`)
    IndexPtr,
    "indices"
);
arena_ptr!(
    /// Offset into the pointer-table arena (`u32`)
    TablePtr,
    "tables"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointer_semantics() {
        assert!(ValuePtr::NULL.is_null());
        assert_eq!(ValuePtr::NULL.offset(), None);
        assert_eq!(ValuePtr::NULL.add(16), ValuePtr::NULL);
        assert_eq!(ValuePtr::default(), ValuePtr::NULL);
    }

    #[test]
    fn test_pointer_arithmetic() {
        let p = IndexPtr::at(32);
        assert_eq!(p.offset(), Some(32));
        assert_eq!(p.add(8), IndexPtr::at(40));
        assert_eq!(format!("{:?}", p), "IndexPtr(indices+32)");
    }
}
