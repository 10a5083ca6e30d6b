// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arena Sub-Allocation
//!
//! Every cell group owns three device arrays (values, indices, pointer
//! tables). Shared-state arrays, mechanism storage and pointer tables are all
//! carved out of them by bump allocation, and addressed by element offset.
//!
//! - Every allocation starts at a multiple of the execution space alignment
//! - Growth re-allocates (doubling) and keeps offsets and contents
//! - Fresh storage holds the arena fill value (`NaN` for values, `0` otherwise)
//!
//! Arenas are never compacted; storage is released when the set is dropped.

use crate::traits::{DeviceArray, ExecutionSpace, Result, RuntimeError, Scalar};
use core::fmt;
use neurocable_mechanism::{round_up, Index, IndexPtr, TablePtr, Value, ValuePtr};

/// Largest element count addressable by a 32-bit arena pointer
/// (`u32::MAX` is the null sentinel)
pub const MAX_ARENA_ELEMENTS: usize = u32::MAX as usize;

/// Default initial capacity, in alignment units
const INITIAL_CHUNKS: usize = 16;

/// Bump allocator over one device array
pub struct Arena<S: ExecutionSpace, T: Scalar> {
    label: &'static str,
    array: S::Array<T>,
    used: usize,
    fill: T,
    alignment: usize,
}

impl<S: ExecutionSpace, T: Scalar> Arena<S, T> {
    /// Empty arena with room for `capacity` elements
    pub fn new(space: &S, label: &'static str, capacity: usize, fill: T) -> Result<Self> {
        let alignment = space.alignment().max(1);
        let limit = limit(space);
        let capacity = round_up(capacity.max(1), alignment);
        if capacity > limit {
            return Err(RuntimeError::CapacityExceeded {
                requested: capacity,
                available: limit,
            });
        }
        Ok(Self {
            label,
            array: space.allocate(capacity, fill)?,
            used: 0,
            fill,
            alignment,
        })
    }

    /// Reserve `len` elements; returns the element offset of the region
    pub fn alloc(&mut self, space: &S, len: usize) -> Result<usize> {
        let limit = limit(space);
        let start = round_up(self.used, self.alignment);
        let end = start
            .checked_add(len)
            .filter(|&end| end <= limit)
            .ok_or(RuntimeError::CapacityExceeded {
                requested: start.saturating_add(len),
                available: limit,
            })?;

        let capacity = self.array.len();
        if end > capacity {
            let new_capacity = end.max(capacity.saturating_mul(2)).min(limit);
            space.grow(&mut self.array, new_capacity, self.fill)?;
        }
        self.used = end;
        Ok(start)
    }

    /// Reserve room for `src` and copy it in
    pub fn alloc_from(&mut self, space: &S, src: &[T]) -> Result<usize> {
        let offset = self.alloc(space, src.len())?;
        space.write(&mut self.array, offset, src)?;
        Ok(offset)
    }

    /// Elements handed out so far (including alignment gaps)
    pub fn used(&self) -> usize {
        self.used
    }

    /// Current size of the backing device array
    pub fn capacity(&self) -> usize {
        self.array.len()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn array(&self) -> &S::Array<T> {
        &self.array
    }

    pub fn array_mut(&mut self) -> &mut S::Array<T> {
        &mut self.array
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        RuntimeError::check_range(offset, len, self.used)
    }

    pub fn write(&mut self, space: &S, offset: usize, src: &[T]) -> Result<()> {
        self.check(offset, src.len())?;
        space.write(&mut self.array, offset, src)
    }

    pub fn fill(&mut self, space: &S, offset: usize, len: usize, value: T) -> Result<()> {
        self.check(offset, len)?;
        space.fill(&mut self.array, offset, len, value)
    }

    pub fn copy_within(&mut self, space: &S, src: usize, dst: usize, len: usize) -> Result<()> {
        self.check(src, len)?;
        self.check(dst, len)?;
        space.copy_within(&mut self.array, src, dst, len)
    }

    pub fn read(&self, space: &S, offset: usize, len: usize) -> Result<Vec<T>> {
        self.check(offset, len)?;
        space.read(&self.array, offset, len)
    }
}

impl<S: ExecutionSpace, T: Scalar> fmt::Debug for Arena<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("label", &self.label)
            .field("used", &self.used)
            .field("capacity", &self.array.len())
            .field("alignment", &self.alignment)
            .finish()
    }
}

/// Null pointers resolve to an out-of-range access
/// Element limit of one arena on `space`
fn limit<S: ExecutionSpace>(space: &S) -> usize {
    space.max_elements().min(MAX_ARENA_ELEMENTS)
}

fn resolve(offset: Option<usize>, len: usize) -> Result<usize> {
    offset.ok_or(RuntimeError::OutOfRange {
        offset: MAX_ARENA_ELEMENTS,
        len,
        array_len: 0,
    })
}

/// The value, index and pointer-table arenas of one cell group
#[derive(Debug)]
pub struct ArenaSet<S: ExecutionSpace> {
    pub values: Arena<S, Value>,
    pub indices: Arena<S, Index>,
    pub tables: Arena<S, u32>,
}

impl<S: ExecutionSpace> ArenaSet<S> {
    pub fn new(space: &S) -> Result<Self> {
        let initial = INITIAL_CHUNKS * space.alignment().max(1);
        Self::with_capacity(space, initial, initial, initial)
    }

    pub fn with_capacity(space: &S, values: usize, indices: usize, tables: usize) -> Result<Self> {
        Ok(Self {
            values: Arena::new(space, "values", values, Value::NAN)?,
            indices: Arena::new(space, "indices", indices, 0)?,
            tables: Arena::new(space, "tables", tables, 0)?,
        })
    }

    // === Allocation ===

    /// `len` values, NaN-filled
    pub fn alloc_values(&mut self, space: &S, len: usize) -> Result<ValuePtr> {
        Ok(ValuePtr::at(self.values.alloc(space, len)?))
    }

    pub fn push_values(&mut self, space: &S, src: &[Value]) -> Result<ValuePtr> {
        Ok(ValuePtr::at(self.values.alloc_from(space, src)?))
    }

    /// `len` indices, zero-filled
    pub fn alloc_indices(&mut self, space: &S, len: usize) -> Result<IndexPtr> {
        Ok(IndexPtr::at(self.indices.alloc(space, len)?))
    }

    pub fn push_indices(&mut self, space: &S, src: &[Index]) -> Result<IndexPtr> {
        Ok(IndexPtr::at(self.indices.alloc_from(space, src)?))
    }

    pub fn push_table(&mut self, space: &S, words: &[u32]) -> Result<TablePtr> {
        Ok(TablePtr::at(self.tables.alloc_from(space, words)?))
    }

    // === Access through pointers ===

    pub fn write_values(&mut self, space: &S, ptr: ValuePtr, src: &[Value]) -> Result<()> {
        let offset = resolve(ptr.offset(), src.len())?;
        self.values.write(space, offset, src)
    }

    pub fn fill_values(&mut self, space: &S, ptr: ValuePtr, len: usize, value: Value) -> Result<()> {
        let offset = resolve(ptr.offset(), len)?;
        self.values.fill(space, offset, len, value)
    }

    pub fn copy_values(&mut self, space: &S, src: ValuePtr, dst: ValuePtr, len: usize) -> Result<()> {
        let src = resolve(src.offset(), len)?;
        let dst = resolve(dst.offset(), len)?;
        self.values.copy_within(space, src, dst, len)
    }

    pub fn read_values(&self, space: &S, ptr: ValuePtr, len: usize) -> Result<Vec<Value>> {
        let offset = resolve(ptr.offset(), len)?;
        self.values.read(space, offset, len)
    }

    pub fn write_indices(&mut self, space: &S, ptr: IndexPtr, src: &[Index]) -> Result<()> {
        let offset = resolve(ptr.offset(), src.len())?;
        self.indices.write(space, offset, src)
    }

    pub fn read_indices(&self, space: &S, ptr: IndexPtr, len: usize) -> Result<Vec<Index>> {
        let offset = resolve(ptr.offset(), len)?;
        self.indices.read(space, offset, len)
    }

    pub fn read_table(&self, space: &S, ptr: TablePtr, len: usize) -> Result<Vec<u32>> {
        let offset = resolve(ptr.offset(), len)?;
        self.tables.read(space, offset, len)
    }

    /// `values[v + i] *= indices[m + i]` for `i in 0..n`
    pub fn multiply_in_place(
        &mut self,
        space: &S,
        values: ValuePtr,
        multiplicity: IndexPtr,
        n: usize,
    ) -> Result<()> {
        let v_off = resolve(values.offset(), n)?;
        let i_off = resolve(multiplicity.offset(), n)?;
        self.values.check(v_off, n)?;
        self.indices.check(i_off, n)?;
        space.multiply_in_place(
            &mut self.values.array,
            v_off,
            &self.indices.array,
            i_off,
            n,
        )
    }
}
