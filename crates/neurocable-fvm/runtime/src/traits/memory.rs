// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Execution-space abstraction
//!
//! An execution space owns device memory and runs the few primitive
//! operations the layout and binding code needs. Everything else (layout,
//! pointer wiring, validation) is written once against this trait, so CPU
//! and accelerator backends differ only here and in kernel dispatch.
//!
//! ## Transfer discipline
//!
//! - `write`/`fill`/`copy_within` are complete when they return, as seen by
//!   any later operation on the same space
//! - `read` synchronises with outstanding device work before copying back

use crate::arena::MAX_ARENA_ELEMENTS;
use crate::traits::error::Result;
use bytemuck::Pod;
use core::fmt::Debug;
use neurocable_mechanism::{Index, Value};

/// Element types that may live in device memory
pub trait Scalar: Pod + Send + Sync + Debug + PartialEq + 'static {}

impl Scalar for f32 {}
impl Scalar for i32 {}
impl Scalar for u32 {}

/// Backend-resident array of `T`
pub trait DeviceArray<T: Scalar>: Send + Sync {
    /// Number of elements
    fn len(&self) -> usize;

    /// True if the array holds no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backend seam: memory management and primitive device operations
///
/// # Example
///
/// ```ignore
/// impl ExecutionSpace for CpuBackend {
///     type Array<T: Scalar> = HostArray<T>;
///
///     fn platform_name(&self) -> &'static str { "CPU" }
///     fn alignment(&self) -> usize { self.alignment }
///     // ...
/// }
/// ```
pub trait ExecutionSpace: Send + Sync {
    /// Device array type (generic over element type T)
    type Array<T: Scalar>: DeviceArray<T>;

    /// Platform name for logging/debugging
    fn platform_name(&self) -> &'static str;

    /// Vector/warp width in elements; padded widths are multiples of it
    fn alignment(&self) -> usize;

    /// Largest array, in elements, the device can hold and bind
    fn max_elements(&self) -> usize {
        MAX_ARENA_ELEMENTS
    }

    /// New array of `len` elements, every element set to `fill`
    fn allocate<T: Scalar>(&self, len: usize, fill: T) -> Result<Self::Array<T>>;

    /// Re-allocate to `new_len` elements keeping existing contents; new
    /// elements are set to `fill`
    fn grow<T: Scalar>(&self, array: &mut Self::Array<T>, new_len: usize, fill: T) -> Result<()>;

    /// Host to device copy of `src` into `array[offset..]`
    fn write<T: Scalar>(&self, array: &mut Self::Array<T>, offset: usize, src: &[T]) -> Result<()>;

    /// Set `array[offset..offset + len]` to `value`
    fn fill<T: Scalar>(
        &self,
        array: &mut Self::Array<T>,
        offset: usize,
        len: usize,
        value: T,
    ) -> Result<()>;

    /// Copy `len` elements from `src` to `dst` within one array (ranges may
    /// not overlap)
    fn copy_within<T: Scalar>(
        &self,
        array: &mut Self::Array<T>,
        src: usize,
        dst: usize,
        len: usize,
    ) -> Result<()>;

    /// Device to host copy of `array[offset..offset + len]`
    fn read<T: Scalar>(&self, array: &Self::Array<T>, offset: usize, len: usize) -> Result<Vec<T>>;

    /// `values[v_off + i] *= indices[i_off + i]` for `i in 0..n`
    fn multiply_in_place(
        &self,
        values: &mut Self::Array<Value>,
        v_off: usize,
        indices: &Self::Array<Index>,
        i_off: usize,
        n: usize,
    ) -> Result<()>;

    /// Wait for all submitted device work
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
