// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # CPU Backend
//!
//! Host-memory execution space. Device arrays are plain vectors, transfers
//! are memory copies, and `multiply_in_place` goes data-parallel with rayon
//! once a sweep is long enough to pay for the fork.

use super::BackendConfig;
use neurocable_mechanism::{Index, Value};
use neurocable_runtime::std_impl::multiply_in_place;
use neurocable_runtime::{ExecutionSpace, HostArray, Result, Scalar};
use tracing::info;

/// Default CPU alignment: one 256-bit register of `f32`
pub const DEFAULT_CPU_ALIGNMENT: usize = 8;

/// Default sweep length before rayon is used
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// CPU execution space
#[derive(Debug, Clone)]
pub struct CpuBackend {
    /// Backend name for logging
    name: String,
    alignment: usize,
    parallel_threshold: usize,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::with_alignment(DEFAULT_CPU_ALIGNMENT)
    }

    /// CPU backend padding widths to `alignment` elements
    pub fn with_alignment(alignment: usize) -> Self {
        Self {
            name: format!("CPU (align {})", alignment.max(1)),
            alignment: alignment.max(1),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let backend = Self {
            parallel_threshold: config.parallel_threshold.max(1),
            ..Self::with_alignment(config.cpu_alignment)
        };
        info!(
            "Using CPU backend (alignment {}, parallel above {} sites)",
            backend.alignment, backend.parallel_threshold
        );
        backend
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionSpace for CpuBackend {
    type Array<T: Scalar> = HostArray<T>;

    fn platform_name(&self) -> &'static str {
        "CPU"
    }

    fn alignment(&self) -> usize {
        self.alignment
    }

    fn allocate<T: Scalar>(&self, len: usize, fill: T) -> Result<HostArray<T>> {
        Ok(HostArray::filled(len, fill))
    }

    fn grow<T: Scalar>(&self, array: &mut HostArray<T>, new_len: usize, fill: T) -> Result<()> {
        array.grow(new_len, fill);
        Ok(())
    }

    fn write<T: Scalar>(&self, array: &mut HostArray<T>, offset: usize, src: &[T]) -> Result<()> {
        array.write(offset, src)
    }

    fn fill<T: Scalar>(
        &self,
        array: &mut HostArray<T>,
        offset: usize,
        len: usize,
        value: T,
    ) -> Result<()> {
        array.fill(offset, len, value)
    }

    fn copy_within<T: Scalar>(
        &self,
        array: &mut HostArray<T>,
        src: usize,
        dst: usize,
        len: usize,
    ) -> Result<()> {
        array.copy_within(src, dst, len)
    }

    fn read<T: Scalar>(&self, array: &HostArray<T>, offset: usize, len: usize) -> Result<Vec<T>> {
        array.read(offset, len)
    }

    fn multiply_in_place(
        &self,
        values: &mut HostArray<Value>,
        v_off: usize,
        indices: &HostArray<Index>,
        i_off: usize,
        n: usize,
    ) -> Result<()> {
        multiply_in_place(values, v_off, indices, i_off, n, self.parallel_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocable_runtime::DeviceArray;

    #[test]
    fn test_default_alignment() {
        let cpu = CpuBackend::new();
        assert_eq!(cpu.alignment(), 8);
        assert_eq!(cpu.platform_name(), "CPU");
    }

    #[test]
    fn test_zero_alignment_is_clamped() {
        assert_eq!(CpuBackend::with_alignment(0).alignment(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = BackendConfig {
            cpu_alignment: 16,
            parallel_threshold: 32,
            ..Default::default()
        };
        let cpu = CpuBackend::from_config(&config);
        assert_eq!(cpu.alignment(), 16);
        assert_eq!(cpu.parallel_threshold(), 32);
    }

    #[test]
    fn test_array_operations() {
        let cpu = CpuBackend::new();
        let mut a = cpu.allocate(4, 0.0f32).unwrap();
        cpu.write(&mut a, 1, &[1.0, 2.0]).unwrap();
        cpu.grow(&mut a, 8, -1.0).unwrap();
        assert_eq!(a.len(), 8);
        assert_eq!(cpu.read(&a, 0, 5).unwrap(), vec![0.0, 1.0, 2.0, 0.0, -1.0]);
    }
}
