// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mechanism kernel seam
//!
//! Kernels are produced by the mechanism compiler, one set per mechanism
//! type and backend. They see nothing but the parameter pack and the arenas
//! its pointers index into: parameter and state pointers are resolved through
//! the device-resident tables (`pack.parameters`, `pack.state_vars`,
//! `pack.ion_states`), exactly as a GPU kernel would.

use crate::error::Result;
use crate::shared_state::DeliverableEvent;
use neurocable_mechanism::{IonStateView, MechanismSchema, ParameterPack, TablePtr, Value, ValuePtr};
use neurocable_runtime::{ArenaSet, ExecutionSpace};

/// Per-step math of one mechanism type on execution space `S`
///
/// Only `init_mechanism` is required; mechanisms without currents, state
/// updates, ion writes or events leave the rest as no-ops.
pub trait MechanismKernels<S: ExecutionSpace>: Send + Sync {
    /// Apply each state variable's initial value transform
    fn init_mechanism(&self, pack: &ParameterPack, space: &S, arenas: &mut ArenaSet<S>) -> Result<()>;

    /// Accumulate into `vec_i` / `vec_g` and ion currents
    fn compute_currents(
        &self,
        _pack: &ParameterPack,
        _space: &S,
        _arenas: &mut ArenaSet<S>,
    ) -> Result<()> {
        Ok(())
    }

    /// Integrate state variables over `vec_dt`
    fn advance_state(&self, _pack: &ParameterPack, _space: &S, _arenas: &mut ArenaSet<S>) -> Result<()> {
        Ok(())
    }

    /// Write ion concentrations / reversal potentials (writers only)
    fn write_ions(&self, _pack: &ParameterPack, _space: &S, _arenas: &mut ArenaSet<S>) -> Result<()> {
        Ok(())
    }

    /// Consume events due in the current step window, ordered by time
    fn apply_events(
        &self,
        _pack: &ParameterPack,
        _events: &[DeliverableEvent],
        _space: &S,
        _arenas: &mut ArenaSet<S>,
    ) -> Result<()> {
        Ok(())
    }

    /// React to spikes detected on the owning cells
    fn post_event(&self, _pack: &ParameterPack, _space: &S, _arenas: &mut ArenaSet<S>) -> Result<()> {
        Ok(())
    }
}

/// Kernels for mechanisms without dynamics: state stays at its defaults
///
/// `init_mechanism` rewrites every state variable from the schema defaults,
/// so the multiplicity rescale that follows always starts from `default`.
#[derive(Debug, Clone, Default)]
pub struct StaticKernels {
    defaults: Vec<Value>,
}

impl StaticKernels {
    pub fn for_schema(schema: &dyn MechanismSchema) -> Self {
        Self {
            defaults: schema.state_vars().iter().map(|f| f.default_value).collect(),
        }
    }

    pub fn defaults(&self) -> &[Value] {
        &self.defaults
    }
}

impl<S: ExecutionSpace> MechanismKernels<S> for StaticKernels {
    fn init_mechanism(&self, pack: &ParameterPack, space: &S, arenas: &mut ArenaSet<S>) -> Result<()> {
        if self.defaults.is_empty() {
            return Ok(());
        }
        let state_vars = table_values(space, arenas, pack.state_vars, self.defaults.len())?;
        for (ptr, &value) in state_vars.into_iter().zip(&self.defaults) {
            arenas.fill_values(space, ptr, pack.width(), value)?;
        }
        Ok(())
    }
}

/// Resolve `n` value pointers from a device-resident pointer table
pub fn table_values<S: ExecutionSpace>(
    space: &S,
    arenas: &ArenaSet<S>,
    table: TablePtr,
    n: usize,
) -> Result<Vec<ValuePtr>> {
    Ok(arenas
        .read_table(space, table, n)?
        .into_iter()
        .map(ValuePtr)
        .collect())
}

/// Resolve `n` ion views from a device-resident ion table
pub fn table_ions<S: ExecutionSpace>(
    space: &S,
    arenas: &ArenaSet<S>,
    table: TablePtr,
    n: usize,
) -> Result<Vec<IonStateView>> {
    let words = arenas.read_table(space, table, n * IonStateView::WORDS)?;
    Ok(words
        .chunks_exact(IonStateView::WORDS)
        .map(|chunk| {
            let mut view = [0u32; IonStateView::WORDS];
            view.copy_from_slice(chunk);
            IonStateView::from_words(view)
        })
        .collect())
}
