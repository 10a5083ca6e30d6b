// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Cell Group Mechanisms
//!
//! Owns the shared state of one cell group and every mechanism instance
//! placed on it. Construction is all-or-nothing: the first mechanism that
//! fails to bind aborts the whole group.
//!
//! ## Step Order
//!
//! 1. `time_to = min(time + dt, tmax)`, per-compartment `dt`
//! 2. Zero currents and conductivities
//! 3. Per mechanism: deliver events, compute currents
//! 4. Per mechanism: advance state, write ions
//! 5. `time = time_to`

use crate::diagnostics::DiagnosticSink;
use crate::error::{MechanismError, Result};
use crate::mechanism::{Mechanism, MechanismKernels};
use crate::shared_state::{DeliverableEvent, SampleEventStream, SharedState, StimulusConfig};
use neurocable_mechanism::{MechanismId, MechanismLayout, MechanismOverrides, MechanismSchema, Value};
use neurocable_runtime::ExecutionSpace;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything needed to place one mechanism
pub struct MechanismSpec<S: ExecutionSpace> {
    pub schema: Arc<dyn MechanismSchema>,
    pub kernels: Arc<dyn MechanismKernels<S>>,
    pub overrides: MechanismOverrides,
    pub layout: MechanismLayout,
}

impl<S: ExecutionSpace> MechanismSpec<S> {
    pub fn new(
        schema: Arc<dyn MechanismSchema>,
        kernels: Arc<dyn MechanismKernels<S>>,
        layout: MechanismLayout,
    ) -> Self {
        Self {
            schema,
            kernels,
            overrides: MechanismOverrides::default(),
            layout,
        }
    }

    pub fn with_overrides(mut self, overrides: MechanismOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

pub struct CellGroupMechanisms<S: ExecutionSpace> {
    shared: SharedState<S>,
    mechanisms: Vec<Mechanism<S>>,
}

impl<S: ExecutionSpace> CellGroupMechanisms<S> {
    /// Instantiate `specs` in order with ids `0..n`
    ///
    /// Ion states must already be present in `shared`.
    pub fn build(
        mut shared: SharedState<S>,
        specs: Vec<MechanismSpec<S>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let mut mechanisms = Vec::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            let mut mechanism = Mechanism::with_sink(spec.schema, spec.kernels, sink.clone());
            if let Err(err) =
                mechanism.instantiate(MechanismId(i as u32), &mut shared, &spec.overrides, &spec.layout)
            {
                error!("Cell group construction aborted at mechanism {} ({}): {}", i, mechanism.name(), err);
                return Err(err);
            }
            mechanisms.push(mechanism);
        }

        info!(
            "Cell group ready on {}: {} mechanisms, {} value elements",
            shared.space().platform_name(),
            mechanisms.len(),
            shared.arenas().values.used()
        );

        Ok(Self { shared, mechanisms })
    }

    pub fn shared(&self) -> &SharedState<S> {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedState<S> {
        &mut self.shared
    }

    pub fn mechanisms(&self) -> &[Mechanism<S>] {
        &self.mechanisms
    }

    pub fn mechanism(&self, id: MechanismId) -> Option<&Mechanism<S>> {
        self.mechanisms.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<&Mechanism<S>> {
        self.mechanisms.iter().find(|m| m.name() == name)
    }

    /// Summed width of every mechanism
    pub fn total_width(&self) -> usize {
        self.mechanisms.iter().map(|m| m.width()).sum()
    }

    /// Write a parameter of mechanism `id`
    pub fn set_parameter(&mut self, id: MechanismId, name: &str, values: &[Value]) -> Result<()> {
        let mechanism = self.mechanisms.get(id.0 as usize).ok_or_else(|| MechanismError::UnknownField {
            mechanism: id.to_string(),
            field: name.to_string(),
        })?;
        mechanism.set_parameter(&mut self.shared, name, values)
    }

    pub fn push_event(&mut self, event: DeliverableEvent) {
        self.shared.events_mut().push(event);
    }

    /// Reset shared state and (re)initialise every mechanism
    pub fn initialize(&mut self) -> Result<()> {
        self.shared.reset()?;
        self.shared.ions_init_concentration()?;
        for mechanism in &mut self.mechanisms {
            mechanism.initialize(&mut self.shared)?;
        }
        debug!("Initialized {} mechanisms", self.mechanisms.len());
        Ok(())
    }

    pub fn configure_stimulus(&mut self, config: &StimulusConfig) -> Result<()> {
        self.shared.configure_stimulus(config)
    }

    /// [`step`](Self::step), first recording the samples that fall in it
    pub fn step_sampled(
        &mut self,
        dt: Value,
        tmax: Value,
        samples: &mut SampleEventStream,
        sample_time: &mut [Value],
        sample_value: &mut [Value],
    ) -> Result<usize> {
        self.shared.update_time_to(dt, tmax)?;
        let taken = self.shared.take_samples(samples, sample_time, sample_value)?;
        self.step(dt, tmax)?;
        Ok(taken)
    }

    /// Advance one time step of length `dt` (clamped to `tmax`)
    pub fn step(&mut self, dt: Value, tmax: Value) -> Result<()> {
        let shared = &mut self.shared;
        shared.update_time_to(dt, tmax)?;
        shared.set_dt()?;
        shared.zero_currents()?;

        let until = shared.read_values(shared.time_to, shared.n_intdom())?;
        for mechanism in &mut self.mechanisms {
            mechanism.deliver_events_by_intdom(shared, &until)?;
            mechanism.update_current(shared)?;
        }
        shared.add_gj_current()?;
        shared.add_stimulus_current()?;

        for mechanism in &mut self.mechanisms {
            mechanism.update_state(shared)?;
            mechanism.update_ions(shared)?;
        }

        shared.advance_time()
    }
}
