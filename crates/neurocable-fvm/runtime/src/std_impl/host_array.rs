// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Vec-backed device array for host execution spaces
//!
//! All operations are bounds-checked and return `RuntimeError::OutOfRange`
//! instead of panicking.

use crate::traits::{DeviceArray, Result, RuntimeError, Scalar};
use neurocable_mechanism::{Index, Value};
use rayon::prelude::*;

/// Host memory array
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray<T: Scalar> {
    data: Vec<T>,
}

impl<T: Scalar> HostArray<T> {
    /// Array of `len` copies of `fill`
    pub fn filled(len: usize, fill: T) -> Self {
        Self {
            data: vec![fill; len],
        }
    }

    /// Wrap an existing vector
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// All elements
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All elements (mutable)
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Checked sub-slice
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[T]> {
        RuntimeError::check_range(offset, len, self.data.len())?;
        Ok(&self.data[offset..offset + len])
    }

    /// Checked mutable sub-slice
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [T]> {
        RuntimeError::check_range(offset, len, self.data.len())?;
        Ok(&mut self.data[offset..offset + len])
    }

    /// Grow to `new_len` (never shrinks)
    pub fn grow(&mut self, new_len: usize, fill: T) {
        if new_len > self.data.len() {
            self.data.resize(new_len, fill);
        }
    }

    /// Copy `src` into `self[offset..]`
    pub fn write(&mut self, offset: usize, src: &[T]) -> Result<()> {
        self.slice_mut(offset, src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Set a range to `value`
    pub fn fill(&mut self, offset: usize, len: usize, value: T) -> Result<()> {
        self.slice_mut(offset, len)?.fill(value);
        Ok(())
    }

    /// Copy `len` elements from `src` to `dst`
    pub fn copy_within(&mut self, src: usize, dst: usize, len: usize) -> Result<()> {
        RuntimeError::check_range(src, len, self.data.len())?;
        RuntimeError::check_range(dst, len, self.data.len())?;
        self.data.copy_within(src..src + len, dst);
        Ok(())
    }

    /// Copy a range out
    pub fn read(&self, offset: usize, len: usize) -> Result<Vec<T>> {
        Ok(self.slice(offset, len)?.to_vec())
    }
}

impl<T: Scalar> DeviceArray<T> for HostArray<T> {
    fn len(&self) -> usize {
        self.data.len()
    }
}

/// `values[v_off + i] *= indices[i_off + i]`, in parallel when
/// `n >= parallel_threshold`
pub fn multiply_in_place(
    values: &mut HostArray<Value>,
    v_off: usize,
    indices: &HostArray<Index>,
    i_off: usize,
    n: usize,
    parallel_threshold: usize,
) -> Result<()> {
    let factors = indices.slice(i_off, n)?;
    let targets = values.slice_mut(v_off, n)?;
    if n >= parallel_threshold {
        targets
            .par_iter_mut()
            .zip(factors.par_iter())
            .for_each(|(v, &m)| *v *= m as Value);
    } else {
        for (v, &m) in targets.iter_mut().zip(factors) {
            *v *= m as Value;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let mut a = HostArray::filled(8, f32::NAN);
        a.write(2, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.read(2, 3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(a.as_slice()[0].is_nan());
        assert!(a.as_slice()[5].is_nan());
    }

    #[test]
    fn test_out_of_range() {
        let mut a = HostArray::filled(4, 0i32);
        assert!(matches!(
            a.write(3, &[1, 2]),
            Err(RuntimeError::OutOfRange { offset: 3, len: 2, array_len: 4 })
        ));
        assert!(a.read(0, 5).is_err());
        assert!(a.copy_within(0, 3, 2).is_err());
    }

    #[test]
    fn test_grow_preserves_contents() {
        let mut a = HostArray::from_vec(vec![1u32, 2, 3]);
        a.grow(6, 0);
        assert_eq!(a.as_slice(), &[1, 2, 3, 0, 0, 0]);
        a.grow(2, 9);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_copy_within() {
        let mut a = HostArray::from_vec(vec![1.0f32, 2.0, 0.0, 0.0]);
        a.copy_within(0, 2, 2).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_multiply_in_place_serial_and_parallel_agree() {
        let factors = HostArray::from_vec((0..100).map(|i| (i % 4) as Index).collect());
        let mut serial = HostArray::filled(100, 1.5f32);
        let mut parallel = serial.clone();
        multiply_in_place(&mut serial, 0, &factors, 0, 100, usize::MAX).unwrap();
        multiply_in_place(&mut parallel, 0, &factors, 0, 100, 1).unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(serial.as_slice()[3], 4.5);
        assert_eq!(serial.as_slice()[4], 0.0);
    }
}
