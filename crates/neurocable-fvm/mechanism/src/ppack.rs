// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Parameter Pack
//!
//! The flat aggregate handed to mechanism kernels. Every field is a `u32`
//! (a count or an arena offset), so the pack is `Pod` and can be uploaded to
//! a GPU uniform/storage buffer byte for byte.
//!
//! Table pointers (`parameters`, `state_vars`, `ion_states`) point into the
//! table arena: `parameters[i]` is the `ValuePtr` of parameter `i`, and
//! `ion_states` holds one [`IonStateView`] (6 words) per ion.

use crate::types::{IndexPtr, MechanismId, TablePtr, ValuePtr};
use bytemuck::{Pod, Zeroable};

/// Pointers to one ion's shared arrays plus this instance's ion index array
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct IonStateView {
    pub current_density: ValuePtr,
    pub reversal_potential: ValuePtr,
    pub internal_concentration: ValuePtr,
    pub external_concentration: ValuePtr,
    /// Single-element array holding the ionic charge
    pub charge: ValuePtr,
    /// Per-site index into the ion's compartment ordering
    pub index: IndexPtr,
}

impl IonStateView {
    /// Words occupied by one view in the table arena
    pub const WORDS: usize = 6;

    pub fn to_words(self) -> [u32; Self::WORDS] {
        bytemuck::cast(self)
    }

    pub fn from_words(words: [u32; Self::WORDS]) -> Self {
        bytemuck::cast(words)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ParameterPack {
    pub width: u32,
    pub width_padded: u32,
    pub mechanism_id: u32,
    pub n_detectors: u32,

    // Shared state (non-owning)
    pub vec_ci: IndexPtr,
    pub vec_di: IndexPtr,
    pub vec_t: ValuePtr,
    pub vec_dt: ValuePtr,
    pub vec_v: ValuePtr,
    pub vec_i: ValuePtr,
    pub vec_g: ValuePtr,
    pub temperature_degc: ValuePtr,
    pub diam_um: ValuePtr,
    pub time_since_spike: ValuePtr,

    // Instance storage
    pub weight: ValuePtr,
    pub node_index: IndexPtr,
    pub multiplicity: IndexPtr,
    pub globals: ValuePtr,

    // Device-resident pointer tables
    pub parameters: TablePtr,
    pub state_vars: TablePtr,
    pub ion_states: TablePtr,
}

impl Default for ParameterPack {
    fn default() -> Self {
        Self {
            width: 0,
            width_padded: 0,
            mechanism_id: 0,
            n_detectors: 0,
            vec_ci: IndexPtr::NULL,
            vec_di: IndexPtr::NULL,
            vec_t: ValuePtr::NULL,
            vec_dt: ValuePtr::NULL,
            vec_v: ValuePtr::NULL,
            vec_i: ValuePtr::NULL,
            vec_g: ValuePtr::NULL,
            temperature_degc: ValuePtr::NULL,
            diam_um: ValuePtr::NULL,
            time_since_spike: ValuePtr::NULL,
            weight: ValuePtr::NULL,
            node_index: IndexPtr::NULL,
            multiplicity: IndexPtr::NULL,
            globals: ValuePtr::NULL,
            parameters: TablePtr::NULL,
            state_vars: TablePtr::NULL,
            ion_states: TablePtr::NULL,
        }
    }
}

impl ParameterPack {
    pub fn id(&self) -> MechanismId {
        MechanismId(self.mechanism_id)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width as usize
    }

    #[inline]
    pub fn uses_multiplicity(&self) -> bool {
        !self.multiplicity.is_null()
    }

    /// Pack as raw bytes (for uniform buffer uploads)
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pack_is_null() {
        let pack = ParameterPack::default();
        assert_eq!(pack.width(), 0);
        assert!(pack.vec_v.is_null());
        assert!(pack.parameters.is_null());
        assert!(!pack.uses_multiplicity());
    }

    #[test]
    fn test_pack_is_flat_words() {
        assert_eq!(core::mem::size_of::<ParameterPack>() % 4, 0);
        assert_eq!(ParameterPack::default().as_bytes().len(), 21 * 4);
    }

    #[test]
    fn test_ion_view_words() {
        let view = IonStateView {
            current_density: ValuePtr::at(8),
            reversal_potential: ValuePtr::at(16),
            internal_concentration: ValuePtr::at(24),
            external_concentration: ValuePtr::at(32),
            charge: ValuePtr::at(40),
            index: IndexPtr::at(48),
        };
        let words = view.to_words();
        assert_eq!(words, [8, 16, 24, 32, 40, 48]);
        assert_eq!(IonStateView::from_words(words), view);
    }
}
