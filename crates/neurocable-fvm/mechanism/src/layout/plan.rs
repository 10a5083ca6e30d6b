// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Padded storage layout of one mechanism instance
//!
//! ```text
//! data:    | weight | param 0 | .. | param P-1 | state 0 | .. | state S-1 | globals (G, unpadded) |
//! indices: | node_index | ion 0 | .. | ion I-1 | multiplicity (optional) |
//! ```
//!
//! Every chunk except the globals tail is `width_padded` long, so with an
//! aligned region start every chunk starts aligned.

use crate::schema::FieldCounts;
use crate::types::Index;
use ahash::AHashMap;

/// Round `n` up to the next multiple of `alignment` (`alignment > 0`)
#[inline]
pub fn round_up(n: usize, alignment: usize) -> usize {
    assert!(alignment > 0, "alignment must be positive");
    n.div_ceil(alignment) * alignment
}

/// Offsets of every chunk relative to the start of the data / indices region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub counts: FieldCounts,
    pub width: usize,
    pub width_padded: usize,
    pub multiplicity: bool,
}

impl LayoutPlan {
    pub fn new(counts: FieldCounts, width: usize, alignment: usize, multiplicity: bool) -> Self {
        Self {
            counts,
            width,
            width_padded: round_up(width, alignment),
            multiplicity,
        }
    }

    /// `(n_parameters + n_state_vars + 1) * width_padded + n_globals`
    pub fn data_len(&self) -> usize {
        (self.counts.n_parameters + self.counts.n_state_vars + 1) * self.width_padded
            + self.counts.n_globals
    }

    /// `(1 + n_ions + multiplicity) * width_padded`
    pub fn indices_len(&self) -> usize {
        (1 + self.counts.n_ions + usize::from(self.multiplicity)) * self.width_padded
    }

    pub fn weight_offset(&self) -> usize {
        0
    }

    pub fn parameter_offset(&self, idx: usize) -> usize {
        (1 + idx) * self.width_padded
    }

    pub fn state_var_offset(&self, idx: usize) -> usize {
        (1 + self.counts.n_parameters + idx) * self.width_padded
    }

    /// Globals sit last because they break the padded alignment
    pub fn globals_offset(&self) -> usize {
        (1 + self.counts.n_parameters + self.counts.n_state_vars) * self.width_padded
    }

    pub fn node_index_offset(&self) -> usize {
        0
    }

    pub fn ion_index_offset(&self, idx: usize) -> usize {
        (1 + idx) * self.width_padded
    }

    pub fn multiplicity_offset(&self) -> Option<usize> {
        if self.multiplicity {
            Some((1 + self.counts.n_ions) * self.width_padded)
        } else {
            None
        }
    }
}

/// Position of every element of `sub` within `sup`
///
/// Used to translate placement compartments into an ion's own compartment
/// ordering. Repeated entries in `sub` map to the same position. Returns the
/// first element of `sub` that `sup` does not contain as the error.
pub fn index_into(sub: &[Index], sup: &[Index]) -> Result<Vec<Index>, Index> {
    let mut position: AHashMap<Index, Index> = AHashMap::with_capacity(sup.len());
    for (i, &cv) in sup.iter().enumerate() {
        position.entry(cv).or_insert(i as Index);
    }
    sub.iter()
        .map(|cv| position.get(cv).copied().ok_or(*cv))
        .collect()
}
