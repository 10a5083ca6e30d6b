// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Mechanism Instance
//!
//! One mechanism type placed on a set of compartments of one cell group.
//!
//! ## Instantiation
//!
//! 1. Cache width, padded width, multiplicity flag and id; wire the pack to
//!    the shared-state arrays (non-owning)
//! 2. Bind every ion under its rebound name; a missing ion state is fatal
//! 3. Width zero stops here
//! 4. Lay out `data` (weight, parameters, state variables, globals tail) and
//!    `indices` (node index, one index array per ion, multiplicity) from the
//!    [`LayoutPlan`], filling defaults
//! 5. Copy the host pointer tables into the table arena and point the pack at
//!    the device copies
//!
//! The layout algorithm is written once against [`ExecutionSpace`]; the CPU
//! and GPU backends differ only in how the copies in steps 4-5 reach memory.

mod kernels;
mod lifecycle;

pub use kernels::{table_ions, table_values, MechanismKernels, StaticKernels};
pub use lifecycle::LifecycleState;

use crate::diagnostics::{DiagnosticSink, InstantiationReport, NullSink, Verbosity};
use crate::error::{MechanismError, Result};
use crate::shared_state::SharedState;
use neurocable_mechanism::{
    index_into, FieldEntry, FieldTable, GlobalTable, Index, IndexPtr, IonStateView, IonTable,
    IonTableEntry, LayoutPlan, MechanismId, MechanismLayout, MechanismOverrides, MechanismSchema,
    ParameterPack, StateTable, Value, ValuePtr,
};
use neurocable_runtime::ExecutionSpace;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub struct Mechanism<S: ExecutionSpace> {
    schema: Arc<dyn MechanismSchema>,
    kernels: Arc<dyn MechanismKernels<S>>,
    sink: Arc<dyn DiagnosticSink>,
    state: LifecycleState,

    pack: ParameterPack,

    // Host-side pointer tables (device copies live behind pack.parameters etc.)
    parameters_h: Vec<ValuePtr>,
    state_vars_h: Vec<ValuePtr>,
    ion_states_h: Vec<IonStateView>,
    globals_h: Vec<Value>,

    /// Start of the `data` / `indices` regions (null until laid out)
    data: ValuePtr,
    indices: IndexPtr,
}

impl<S: ExecutionSpace> Mechanism<S> {
    pub fn new(schema: Arc<dyn MechanismSchema>, kernels: Arc<dyn MechanismKernels<S>>) -> Self {
        Self::with_sink(schema, kernels, Arc::new(NullSink))
    }

    pub fn with_sink(
        schema: Arc<dyn MechanismSchema>,
        kernels: Arc<dyn MechanismKernels<S>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let counts = schema.counts();
        let globals_h = schema.globals().iter().map(|g| g.default_value).collect();
        Self {
            schema,
            kernels,
            sink,
            state: LifecycleState::Created,
            pack: ParameterPack::default(),
            parameters_h: vec![ValuePtr::NULL; counts.n_parameters],
            state_vars_h: vec![ValuePtr::NULL; counts.n_state_vars],
            ion_states_h: vec![IonStateView::default(); counts.n_ions],
            globals_h,
            data: ValuePtr::NULL,
            indices: IndexPtr::NULL,
        }
    }

    // === Scalar facts ===

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<dyn MechanismSchema> {
        &self.schema
    }

    pub fn id(&self) -> MechanismId {
        self.pack.id()
    }

    pub fn width(&self) -> usize {
        self.pack.width()
    }

    pub fn width_padded(&self) -> usize {
        self.pack.width_padded as usize
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Parameter pack as handed to kernels
    pub fn pack(&self) -> &ParameterPack {
        &self.pack
    }

    pub fn parameters_h(&self) -> &[ValuePtr] {
        &self.parameters_h
    }

    pub fn state_vars_h(&self) -> &[ValuePtr] {
        &self.state_vars_h
    }

    pub fn ion_states_h(&self) -> &[IonStateView] {
        &self.ion_states_h
    }

    /// Host copy of the globals as written at instantiation
    pub fn globals_h(&self) -> &[Value] {
        &self.globals_h
    }

    /// Start of the value region (weight chunk); null when width is zero
    pub fn data(&self) -> ValuePtr {
        self.data
    }

    /// Start of the index region (node index chunk); null when width is zero
    pub fn indices(&self) -> IndexPtr {
        self.indices
    }

    // === Instantiation ===

    /// Bind to `shared` and lay out storage for `layout`
    ///
    /// Any error leaves the instance `Failed`; the cell group that owns it
    /// must not be stepped.
    pub fn instantiate(
        &mut self,
        id: MechanismId,
        shared: &mut SharedState<S>,
        overrides: &MechanismOverrides,
        layout: &MechanismLayout,
    ) -> Result<()> {
        if self.state != LifecycleState::Created {
            return Err(self.lifecycle_error("instantiate"));
        }
        match self.bind(id, shared, overrides, layout) {
            Ok(()) => {
                self.state = LifecycleState::Instantiated;
                self.report(shared.space().platform_name());
                Ok(())
            }
            Err(err) => {
                self.state = LifecycleState::Failed;
                Err(err)
            }
        }
    }

    fn bind(
        &mut self,
        id: MechanismId,
        shared: &mut SharedState<S>,
        overrides: &MechanismOverrides,
        layout: &MechanismLayout,
    ) -> Result<()> {
        self.schema.validate_names()?;
        layout.validate()?;
        shared.register_mechanism_id(id)?;

        let width = layout.width();
        let plan = LayoutPlan::new(
            self.schema.counts(),
            width,
            shared.space().alignment(),
            layout.uses_multiplicity(),
        );

        let mut pack = shared.base_pack(id, width, plan.width_padded);
        pack.vec_t = shared.time;

        // Ion views, plus each ion's per-site index when there are sites
        let mut ion_states_h = Vec::with_capacity(plan.counts.n_ions);
        let mut ion_indices: Vec<Vec<Index>> = Vec::with_capacity(plan.counts.n_ions);
        for dep in self.schema.ions() {
            let binding = overrides.ion_binding(&dep.name);
            let ion = shared.ion(binding).ok_or_else(|| MechanismError::IonBinding {
                mechanism: self.name().to_string(),
                ion: dep.name.clone(),
                binding: binding.to_string(),
            })?;
            if let Some(expected) = dep.expected_ionic_charge {
                if expected != ion.charge() {
                    warn!(
                        "{}: ion '{}' bound to '{}' with charge {}, expected {}",
                        self.name(),
                        dep.name,
                        binding,
                        ion.charge(),
                        expected
                    );
                }
            }
            ion_states_h.push(ion.view());
            if width > 0 {
                let index = index_into(&layout.cv, ion.node_index()).map_err(|cv| {
                    MechanismError::IonCoverage {
                        mechanism: self.name().to_string(),
                        ion: binding.to_string(),
                        cv,
                    }
                })?;
                ion_indices.push(index);
            }
        }

        // Globals: defaults, then overrides by name
        let mut globals_h: Vec<Value> = self.schema.globals().iter().map(|g| g.default_value).collect();
        for (name, &value) in &overrides.globals {
            let idx = self
                .schema
                .global_index(name)
                .ok_or_else(|| MechanismError::UnknownGlobal {
                    mechanism: self.name().to_string(),
                    name: name.clone(),
                })?;
            globals_h[idx] = value;
        }

        self.globals_h = globals_h;
        if width == 0 {
            self.ion_states_h = ion_states_h;
            self.pack = pack;
            return Ok(());
        }

        let (space, arenas) = shared.split_mut();

        // Values: weight | parameters | state variables | globals
        let data = arenas.alloc_values(space, plan.data_len())?;
        arenas.fill_values(space, data, plan.data_len(), Value::NAN)?;
        arenas.write_values(space, data.add(plan.weight_offset()), &layout.weight)?;
        let parameters_h: Vec<ValuePtr> = self
            .schema
            .parameters()
            .iter()
            .enumerate()
            .map(|(i, field)| -> Result<ValuePtr> {
                let ptr = data.add(plan.parameter_offset(i));
                arenas.fill_values(space, ptr, width, field.default_value)?;
                Ok(ptr)
            })
            .collect::<Result<Vec<_>>>()?;
        let state_vars_h: Vec<ValuePtr> = self
            .schema
            .state_vars()
            .iter()
            .enumerate()
            .map(|(i, field)| -> Result<ValuePtr> {
                let ptr = data.add(plan.state_var_offset(i));
                arenas.fill_values(space, ptr, width, field.default_value)?;
                Ok(ptr)
            })
            .collect::<Result<Vec<_>>>()?;
        let globals = data.add(plan.globals_offset());
        arenas.write_values(space, globals, &self.globals_h)?;

        // Indices: node index | ion indices | multiplicity
        let indices = arenas.alloc_indices(space, plan.indices_len())?;
        let node_index = indices.add(plan.node_index_offset());
        arenas.write_indices(space, node_index, &layout.cv)?;
        for (i, (view, index)) in ion_states_h.iter_mut().zip(&ion_indices).enumerate() {
            view.index = indices.add(plan.ion_index_offset(i));
            arenas.write_indices(space, view.index, index)?;
        }
        let multiplicity = match plan.multiplicity_offset() {
            Some(offset) => {
                let ptr = indices.add(offset);
                arenas.write_indices(space, ptr, &layout.multiplicity)?;
                ptr
            }
            None => IndexPtr::NULL,
        };

        // Pointer tables to the device
        let parameter_words: Vec<u32> = parameters_h.iter().map(|p| p.0).collect();
        let state_var_words: Vec<u32> = state_vars_h.iter().map(|p| p.0).collect();
        let ion_words: Vec<u32> = ion_states_h.iter().flat_map(|v| v.to_words()).collect();
        pack.parameters = arenas.push_table(space, &parameter_words)?;
        pack.state_vars = arenas.push_table(space, &state_var_words)?;
        pack.ion_states = arenas.push_table(space, &ion_words)?;

        pack.weight = data.add(plan.weight_offset());
        pack.globals = globals;
        pack.node_index = node_index;
        pack.multiplicity = multiplicity;

        self.data = data;
        self.indices = indices;
        self.parameters_h = parameters_h;
        self.state_vars_h = state_vars_h;
        self.ion_states_h = ion_states_h;
        self.pack = pack;
        Ok(())
    }

    fn report(&self, platform: &'static str) {
        if self.sink.verbosity() == Verbosity::Off {
            return;
        }
        self.sink.instantiated(&InstantiationReport {
            mechanism: self.name(),
            id: self.id(),
            platform,
            width: self.width(),
            width_padded: self.width_padded(),
            multiplicity: self.pack.uses_multiplicity(),
            parameters_h: &self.parameters_h,
            state_vars_h: &self.state_vars_h,
            ion_states_h: &self.ion_states_h,
            globals_h: &self.globals_h,
            pack: &self.pack,
        });
    }

    // === Accessors ===

    /// Overwrite a parameter or state variable on every site
    pub fn set_parameter(&self, shared: &mut SharedState<S>, name: &str, values: &[Value]) -> Result<()> {
        self.require_bound("set_parameter")?;
        let width = self.width();
        if values.len() != width {
            return Err(MechanismError::SizeMismatch {
                mechanism: self.name().to_string(),
                field: name.to_string(),
                expected: width,
                actual: values.len(),
            });
        }
        let ptr = self.field_data(name).ok_or_else(|| MechanismError::UnknownField {
            mechanism: self.name().to_string(),
            field: name.to_string(),
        })?;
        if width == 0 {
            return Ok(());
        }
        shared.write_values(ptr, values)
    }

    /// Pointer of a named parameter or state variable (parameters first)
    ///
    /// `None` if the name is unknown; a null pointer for known names when the
    /// instance has no sites.
    pub fn field_data(&self, name: &str) -> Option<ValuePtr> {
        self.schema
            .parameter_index(name)
            .map(|i| self.parameters_h[i])
            .or_else(|| self.schema.state_var_index(name).map(|i| self.state_vars_h[i]))
    }

    /// Current contents of a named field over `width` sites
    pub fn field_values(&self, shared: &SharedState<S>, name: &str) -> Result<Vec<Value>> {
        let ptr = self.field_data(name).ok_or_else(|| MechanismError::UnknownField {
            mechanism: self.name().to_string(),
            field: name.to_string(),
        })?;
        if self.width() == 0 {
            return Ok(Vec::new());
        }
        shared.read_values(ptr, self.width())
    }

    /// Parameters then state variables, in descriptor order
    pub fn field_table(&self) -> FieldTable {
        let parameters = self.schema.parameters().iter().zip(&self.parameters_h);
        let state_vars = self.schema.state_vars().iter().zip(&self.state_vars_h);
        parameters
            .chain(state_vars)
            .map(|(field, &data)| FieldEntry {
                name: field.name.clone(),
                data,
                default_value: field.default_value,
            })
            .collect()
    }

    pub fn state_table(&self) -> StateTable {
        self.schema
            .state_vars()
            .iter()
            .zip(&self.state_vars_h)
            .map(|(field, &data)| FieldEntry {
                name: field.name.clone(),
                data,
                default_value: field.default_value,
            })
            .collect()
    }

    /// Global names with their current device values
    pub fn global_table(&self, shared: &SharedState<S>) -> Result<GlobalTable> {
        let n = self.globals_h.len();
        let values = if self.pack.globals.is_null() || n == 0 {
            self.globals_h.clone()
        } else {
            shared.read_values(self.pack.globals, n)?
        };
        Ok(self
            .schema
            .globals()
            .iter()
            .zip(values)
            .map(|(field, value)| (field.name.clone(), value))
            .collect())
    }

    /// Declared ion names with the bound ion views
    pub fn ion_table(&self) -> IonTable {
        self.schema
            .ions()
            .iter()
            .zip(&self.ion_states_h)
            .map(|(dep, &state)| IonTableEntry {
                name: dep.name.clone(),
                state,
            })
            .collect()
    }
}

impl<S: ExecutionSpace> fmt::Debug for Mechanism<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mechanism")
            .field("name", &self.name())
            .field("state", &self.state)
            .field("pack", &self.pack)
            .finish()
    }
}
