// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-ion shared state
//!
//! One `IonState` per ion species in a cell group. Arrays are indexed by the
//! ion's own compartment ordering (`node_index`), which covers only the
//! compartments where some mechanism uses the ion.

use neurocable_mechanism::{Index, IndexPtr, IonStateView, SchemaError, Value, ValuePtr};
use neurocable_runtime::{ArenaSet, ExecutionSpace, Result};

/// Initial and reset values for one ion, per covered compartment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IonConfig {
    /// Compartments covered by the ion, in ion order
    pub cv: Vec<Index>,
    pub init_iconc: Vec<Value>,
    pub init_econc: Vec<Value>,
    pub reset_iconc: Vec<Value>,
    pub reset_econc: Vec<Value>,
    pub init_revpot: Vec<Value>,
}

impl IonConfig {
    /// Same concentrations and reversal potential on every covered compartment
    pub fn uniform(cv: Vec<Index>, iconc: Value, econc: Value, revpot: Value) -> Self {
        let n = cv.len();
        Self {
            cv,
            init_iconc: vec![iconc; n],
            init_econc: vec![econc; n],
            reset_iconc: vec![iconc; n],
            reset_econc: vec![econc; n],
            init_revpot: vec![revpot; n],
        }
    }

    pub fn validate(&self) -> std::result::Result<(), SchemaError> {
        let expected = self.cv.len();
        let fields: [(&'static str, usize); 5] = [
            ("init_iconc", self.init_iconc.len()),
            ("init_econc", self.init_econc.len()),
            ("reset_iconc", self.reset_iconc.len()),
            ("reset_econc", self.reset_econc.len()),
            ("init_revpot", self.init_revpot.len()),
        ];
        for (field, actual) in fields {
            if actual != expected {
                return Err(SchemaError::PlacementMismatch {
                    context: "ion config".to_string(),
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IonState {
    /// `iX`
    pub current_density: ValuePtr,
    /// `eX`
    pub reversal_potential: ValuePtr,
    /// `Xi`
    pub internal_concentration: ValuePtr,
    /// `Xo`
    pub external_concentration: ValuePtr,
    pub init_iconc: ValuePtr,
    pub init_econc: ValuePtr,
    pub reset_iconc: ValuePtr,
    pub reset_econc: ValuePtr,
    pub init_revpot: ValuePtr,
    /// Single element
    pub charge: ValuePtr,
    pub node_index: IndexPtr,
    node_index_h: Vec<Index>,
    charge_h: i32,
}

impl IonState {
    /// Carve the ion's arrays out of `arenas`; live arrays start as NaN
    pub(crate) fn new<S: ExecutionSpace>(
        space: &S,
        arenas: &mut ArenaSet<S>,
        charge: i32,
        config: &IonConfig,
    ) -> Result<Self> {
        let n = config.cv.len();
        Ok(Self {
            current_density: arenas.alloc_values(space, n)?,
            reversal_potential: arenas.alloc_values(space, n)?,
            internal_concentration: arenas.alloc_values(space, n)?,
            external_concentration: arenas.alloc_values(space, n)?,
            init_iconc: arenas.push_values(space, &config.init_iconc)?,
            init_econc: arenas.push_values(space, &config.init_econc)?,
            reset_iconc: arenas.push_values(space, &config.reset_iconc)?,
            reset_econc: arenas.push_values(space, &config.reset_econc)?,
            init_revpot: arenas.push_values(space, &config.init_revpot)?,
            charge: arenas.push_values(space, &[charge as Value])?,
            node_index: arenas.push_indices(space, &config.cv)?,
            node_index_h: config.cv.clone(),
            charge_h: charge,
        })
    }

    /// Number of compartments covered
    pub fn len(&self) -> usize {
        self.node_index_h.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_index_h.is_empty()
    }

    pub fn charge(&self) -> i32 {
        self.charge_h
    }

    /// Host copy of the compartment ordering
    pub fn node_index(&self) -> &[Index] {
        &self.node_index_h
    }

    /// Pointer view handed to mechanisms (index array not yet bound)
    pub fn view(&self) -> IonStateView {
        IonStateView {
            current_density: self.current_density,
            reversal_potential: self.reversal_potential,
            internal_concentration: self.internal_concentration,
            external_concentration: self.external_concentration,
            charge: self.charge,
            index: IndexPtr::NULL,
        }
    }

    pub fn init_concentration<S: ExecutionSpace>(
        &self,
        space: &S,
        arenas: &mut ArenaSet<S>,
    ) -> Result<()> {
        let n = self.len();
        arenas.copy_values(space, self.init_iconc, self.internal_concentration, n)?;
        arenas.copy_values(space, self.init_econc, self.external_concentration, n)
    }

    pub fn zero_current<S: ExecutionSpace>(&self, space: &S, arenas: &mut ArenaSet<S>) -> Result<()> {
        arenas.fill_values(space, self.current_density, self.len(), 0.0)
    }

    pub fn reset<S: ExecutionSpace>(&self, space: &S, arenas: &mut ArenaSet<S>) -> Result<()> {
        let n = self.len();
        self.zero_current(space, arenas)?;
        arenas.copy_values(space, self.reset_iconc, self.internal_concentration, n)?;
        arenas.copy_values(space, self.reset_econc, self.external_concentration, n)?;
        arenas.copy_values(space, self.init_revpot, self.reversal_potential, n)
    }
}
