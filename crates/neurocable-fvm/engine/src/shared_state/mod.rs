// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Shared Simulation State
//!
//! Per-cell-group arrays every mechanism reads or writes: time, voltage,
//! current density, conductivity, temperature, diameter, spike timing and the
//! compartment maps, plus the named ion states and the deliverable event
//! queue. Gap junctions and current-clamp stimuli add their currents to the
//! same `current_density` the mechanisms write.
//!
//! The shared state owns the execution space and the cell group's
//! [`ArenaSet`]. Mechanism storage is carved out of the same arenas, so every
//! pointer a parameter pack holds, shared or owned, is an offset into one of
//! three device arrays and is released when the cell group is dropped.

mod events;
mod ion;
mod sampling;
mod stimulus;

pub use events::{DeliverableEvent, DeliverableEventStream};
pub use ion::{IonConfig, IonState};
pub use sampling::{SampleEvent, SampleEventStream};
pub use stimulus::{StimulusConfig, StimulusState};

use crate::error::{MechanismError, Result};
use ahash::{AHashMap, AHashSet};
use neurocable_mechanism::{
    Index, IndexPtr, MechanismId, ParameterPack, SchemaError, Value, ValuePtr,
};
use neurocable_runtime::{ArenaSet, ExecutionSpace, RuntimeError};
use std::fmt;
use tracing::{debug, warn};

const KELVIN_TO_CELSIUS: Value = -273.15;

/// Electrical coupling between two compartments
///
/// Adds `weight * (v[loc.1] - v[loc.0])` of current into `loc.0`. A
/// symmetric junction is listed once from each side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GapJunction {
    pub loc: (Index, Index),
    /// µS
    pub weight: Value,
}

impl GapJunction {
    pub fn new(from: Index, to: Index, weight: Value) -> Self {
        Self { loc: (from, to), weight }
    }
}

/// Static description of a cell group's discretisation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStateConfig {
    /// Number of integration domains
    pub n_intdom: usize,
    pub n_cell: usize,
    /// Spike detectors per cell
    pub n_detector: usize,
    /// Integration domain of each compartment
    pub cv_to_intdom: Vec<Index>,
    /// Cell of each compartment
    pub cv_to_cell: Vec<Index>,
    /// mV, per compartment
    pub init_membrane_potential: Vec<Value>,
    /// K, per compartment
    pub temperature_k: Vec<Value>,
    /// µm, per compartment
    pub diam_um: Vec<Value>,
    pub gap_junctions: Vec<GapJunction>,
    /// Spike source to `time_since_spike` slot (`cell * n_detector + detector`)
    pub src_to_spike: Vec<Index>,
}

impl SharedStateConfig {
    /// Single-domain, single-cell layout with uniform initial values
    pub fn uniform(n_cv: usize, init_membrane_potential: Value, temperature_k: Value, diam_um: Value) -> Self {
        Self {
            n_intdom: 1,
            n_cell: 1,
            n_detector: 0,
            cv_to_intdom: vec![0; n_cv],
            cv_to_cell: vec![0; n_cv],
            init_membrane_potential: vec![init_membrane_potential; n_cv],
            temperature_k: vec![temperature_k; n_cv],
            diam_um: vec![diam_um; n_cv],
            gap_junctions: Vec::new(),
            src_to_spike: Vec::new(),
        }
    }

    pub fn with_gap_junctions(mut self, gap_junctions: Vec<GapJunction>) -> Self {
        self.gap_junctions = gap_junctions;
        self
    }

    pub fn n_cv(&self) -> usize {
        self.cv_to_intdom.len()
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.n_cv();
        let fields: [(&'static str, usize); 4] = [
            ("cv_to_cell", self.cv_to_cell.len()),
            ("init_membrane_potential", self.init_membrane_potential.len()),
            ("temperature_k", self.temperature_k.len()),
            ("diam_um", self.diam_um.len()),
        ];
        for (field, actual) in fields {
            if actual != expected {
                return Err(SchemaError::PlacementMismatch {
                    context: "shared state".to_string(),
                    field,
                    expected,
                    actual,
                }
                .into());
            }
        }
        if let Some(&bad) = self
            .cv_to_intdom
            .iter()
            .find(|&&d| d < 0 || d as usize >= self.n_intdom)
        {
            return Err(RuntimeError::OutOfRange {
                offset: bad.max(0) as usize,
                len: 1,
                array_len: self.n_intdom,
            }
            .into());
        }
        check_indices(self.gap_junctions.iter().flat_map(|gj| [gj.loc.0, gj.loc.1]), expected)?;
        check_indices(self.src_to_spike.iter().copied(), self.n_cell * self.n_detector)?;
        Ok(())
    }
}

/// Every index must address one of `len` elements
fn check_indices(indices: impl IntoIterator<Item = Index>, len: usize) -> Result<()> {
    match indices.into_iter().find(|&i| i < 0 || i as usize >= len) {
        Some(bad) => Err(RuntimeError::OutOfRange {
            offset: bad.max(0) as usize,
            len: 1,
            array_len: len,
        }
        .into()),
        None => Ok(()),
    }
}

pub struct SharedState<S: ExecutionSpace> {
    space: S,
    arenas: ArenaSet<S>,

    n_intdom: usize,
    n_cv: usize,
    n_cell: usize,
    n_detector: usize,

    /// Per integration domain
    pub time: ValuePtr,
    pub time_to: ValuePtr,
    pub dt_intdom: ValuePtr,

    /// Per compartment
    pub dt_cv: ValuePtr,
    pub voltage: ValuePtr,
    pub current_density: ValuePtr,
    pub conductivity: ValuePtr,
    pub init_voltage: ValuePtr,
    pub temperature_degc: ValuePtr,
    pub diam_um: ValuePtr,

    /// Per (cell, detector)
    pub time_since_spike: ValuePtr,

    pub cv_to_intdom: IndexPtr,
    pub cv_to_cell: IndexPtr,
    cv_to_intdom_h: Vec<Index>,

    /// Per spike source
    pub src_to_spike: IndexPtr,
    n_spike_source: usize,

    gap_junctions: Vec<GapJunction>,
    stimulus: StimulusState,

    ion_data: AHashMap<String, IonState>,
    mechanism_ids: AHashSet<MechanismId>,
    events: DeliverableEventStream,
}

impl<S: ExecutionSpace> SharedState<S> {
    pub fn new(space: S, config: SharedStateConfig) -> Result<Self> {
        config.validate()?;

        let n_intdom = config.n_intdom;
        let n_cv = config.n_cv();
        let n_spike = config.n_cell * config.n_detector;
        let temperature_degc: Vec<Value> = config
            .temperature_k
            .iter()
            .map(|t| t + KELVIN_TO_CELSIUS)
            .collect();

        let mut arenas = ArenaSet::new(&space)?;
        let zeros = |n: usize| vec![0.0 as Value; n];

        let time = arenas.push_values(&space, &zeros(n_intdom))?;
        let time_to = arenas.push_values(&space, &zeros(n_intdom))?;
        let dt_intdom = arenas.push_values(&space, &zeros(n_intdom))?;
        let dt_cv = arenas.push_values(&space, &zeros(n_cv))?;
        let voltage = arenas.push_values(&space, &config.init_membrane_potential)?;
        let current_density = arenas.push_values(&space, &zeros(n_cv))?;
        let conductivity = arenas.push_values(&space, &zeros(n_cv))?;
        let init_voltage = arenas.push_values(&space, &config.init_membrane_potential)?;
        let temperature_degc = arenas.push_values(&space, &temperature_degc)?;
        let diam_um = arenas.push_values(&space, &config.diam_um)?;
        let time_since_spike = arenas.push_values(&space, &vec![-1.0; n_spike])?;
        let cv_to_intdom = arenas.push_indices(&space, &config.cv_to_intdom)?;
        let cv_to_cell = arenas.push_indices(&space, &config.cv_to_cell)?;
        let src_to_spike = arenas.push_indices(&space, &config.src_to_spike)?;

        debug!(
            "Shared state on {}: {} compartments, {} integration domains, {} cells, {} gap junctions",
            space.platform_name(),
            n_cv,
            n_intdom,
            config.n_cell,
            config.gap_junctions.len()
        );

        Ok(Self {
            space,
            arenas,
            n_intdom,
            n_cv,
            n_cell: config.n_cell,
            n_detector: config.n_detector,
            time,
            time_to,
            dt_intdom,
            dt_cv,
            voltage,
            current_density,
            conductivity,
            init_voltage,
            temperature_degc,
            diam_um,
            time_since_spike,
            cv_to_intdom,
            cv_to_cell,
            cv_to_intdom_h: config.cv_to_intdom,
            src_to_spike,
            n_spike_source: config.src_to_spike.len(),
            gap_junctions: config.gap_junctions,
            stimulus: StimulusState::default(),
            ion_data: AHashMap::new(),
            mechanism_ids: AHashSet::new(),
            events: DeliverableEventStream::new(),
        })
    }

    // === Accessors ===

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn arenas(&self) -> &ArenaSet<S> {
        &self.arenas
    }

    /// Execution space and mutable arenas, borrowed together for kernels
    pub fn split_mut(&mut self) -> (&S, &mut ArenaSet<S>) {
        (&self.space, &mut self.arenas)
    }

    pub fn n_intdom(&self) -> usize {
        self.n_intdom
    }

    pub fn n_cv(&self) -> usize {
        self.n_cv
    }

    pub fn n_cell(&self) -> usize {
        self.n_cell
    }

    pub fn n_detector(&self) -> usize {
        self.n_detector
    }

    pub fn events(&self) -> &DeliverableEventStream {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut DeliverableEventStream {
        &mut self.events
    }

    pub fn n_gj(&self) -> usize {
        self.gap_junctions.len()
    }

    pub fn gap_junctions(&self) -> &[GapJunction] {
        &self.gap_junctions
    }

    pub fn n_spike_source(&self) -> usize {
        self.n_spike_source
    }

    pub fn stimulus(&self) -> &StimulusState {
        &self.stimulus
    }

    // === Stimuli ===

    /// Replace the cell group's stimuli
    pub fn configure_stimulus(&mut self, config: &StimulusConfig) -> Result<()> {
        self.stimulus = StimulusState::new(&self.space, &mut self.arenas, config, self.n_cv)?;
        debug!(
            "Configured {} stimuli on {} compartments",
            self.stimulus.len(),
            self.stimulus.accumulator_cvs().len()
        );
        Ok(())
    }

    // === Ions ===

    /// Add (or replace) the ion state `name`
    pub fn add_ion(&mut self, name: impl Into<String>, charge: i32, config: &IonConfig) -> Result<()> {
        config.validate()?;
        let name = name.into();
        let state = IonState::new(&self.space, &mut self.arenas, charge, config)?;
        if self.ion_data.insert(name.clone(), state).is_some() {
            warn!("Ion '{}' re-added; earlier bindings keep the old arrays", name);
        }
        Ok(())
    }

    pub fn ion(&self, name: &str) -> Option<&IonState> {
        self.ion_data.get(name)
    }

    pub fn ions(&self) -> impl Iterator<Item = (&str, &IonState)> {
        self.ion_data.iter().map(|(k, v)| (k.as_str(), v))
    }

    // === Mechanism registration ===

    pub fn register_mechanism_id(&mut self, id: MechanismId) -> Result<()> {
        if !self.mechanism_ids.insert(id) {
            return Err(MechanismError::DuplicateId(id));
        }
        Ok(())
    }

    /// Pack with every shared-state field wired (non-owning)
    pub fn base_pack(&self, id: MechanismId, width: usize, width_padded: usize) -> ParameterPack {
        ParameterPack {
            width: width as u32,
            width_padded: width_padded as u32,
            mechanism_id: id.0,
            n_detectors: self.n_detector as u32,
            vec_ci: self.cv_to_cell,
            vec_di: self.cv_to_intdom,
            vec_t: self.time,
            vec_dt: self.dt_cv,
            vec_v: self.voltage,
            vec_i: self.current_density,
            vec_g: self.conductivity,
            temperature_degc: self.temperature_degc,
            diam_um: self.diam_um,
            time_since_spike: self.time_since_spike,
            ..ParameterPack::default()
        }
    }

    // === Whole-state operations ===

    /// Back to t = 0 with initial voltage and reset ion concentrations
    pub fn reset(&mut self) -> Result<()> {
        let (space, arenas) = (&self.space, &mut self.arenas);
        arenas.copy_values(space, self.init_voltage, self.voltage, self.n_cv)?;
        arenas.fill_values(space, self.current_density, self.n_cv, 0.0)?;
        arenas.fill_values(space, self.conductivity, self.n_cv, 0.0)?;
        arenas.fill_values(space, self.time, self.n_intdom, 0.0)?;
        arenas.fill_values(space, self.time_to, self.n_intdom, 0.0)?;
        arenas.fill_values(space, self.time_since_spike, self.n_cell * self.n_detector, -1.0)?;
        for ion in self.ion_data.values() {
            ion.reset(space, arenas)?;
        }
        self.stimulus.reset(space, arenas)?;
        self.events.clear();
        Ok(())
    }

    pub fn zero_currents(&mut self) -> Result<()> {
        let (space, arenas) = (&self.space, &mut self.arenas);
        arenas.fill_values(space, self.current_density, self.n_cv, 0.0)?;
        arenas.fill_values(space, self.conductivity, self.n_cv, 0.0)?;
        for ion in self.ion_data.values() {
            ion.zero_current(space, arenas)?;
        }
        self.stimulus.zero_current(space, arenas)?;
        Ok(())
    }

    /// `i[a] -= w * (v[b] - v[a])` for every gap junction `(a, b, w)`
    pub fn add_gj_current(&mut self) -> Result<()> {
        if self.gap_junctions.is_empty() {
            return Ok(());
        }
        let voltage = self.read_values(self.voltage, self.n_cv)?;
        let mut current = self.read_values(self.current_density, self.n_cv)?;
        // Compartment indices were range-checked at construction
        for gj in &self.gap_junctions {
            let (a, b) = (gj.loc.0 as usize, gj.loc.1 as usize);
            current[a] -= gj.weight * (voltage[b] - voltage[a]);
        }
        self.write_values(self.current_density, &current)
    }

    /// Add every stimulus, evaluated at its domain's `time`
    pub fn add_stimulus_current(&mut self) -> Result<()> {
        if self.stimulus.is_empty() {
            return Ok(());
        }
        let time = self.read_values(self.time, self.n_intdom)?;
        self.stimulus.add_current(
            &self.space,
            &mut self.arenas,
            &time,
            &self.cv_to_intdom_h,
            self.current_density,
            self.n_cv,
        )
    }

    /// Record the sample events due in this step (`time < time_to` of their
    /// domain) into `sample_time` / `sample_value` at each event's offset;
    /// returns how many were taken
    pub fn take_samples(
        &self,
        samples: &mut SampleEventStream,
        sample_time: &mut [Value],
        sample_value: &mut [Value],
    ) -> Result<usize> {
        let time_to = self.read_values(self.time_to, self.n_intdom)?;
        let due = samples.drain_due(&time_to);
        if due.is_empty() {
            return Ok(0);
        }
        let time = self.read_values(self.time, self.n_intdom)?;
        let slots = sample_time.len().min(sample_value.len());
        for event in &due {
            let offset = event.offset as usize;
            if offset >= slots {
                return Err(RuntimeError::OutOfRange {
                    offset,
                    len: 1,
                    array_len: slots,
                }
                .into());
            }
            sample_time[offset] = time[event.intdom as usize];
            sample_value[offset] = self.read_values(event.handle, 1)?[0];
        }
        Ok(due.len())
    }

    pub fn ions_init_concentration(&mut self) -> Result<()> {
        let (space, arenas) = (&self.space, &mut self.arenas);
        for ion in self.ion_data.values() {
            ion.init_concentration(space, arenas)?;
        }
        Ok(())
    }

    /// `time_to = min(time + dt, tmax)` per integration domain
    pub fn update_time_to(&mut self, dt: Value, tmax: Value) -> Result<()> {
        let time = self.read_values(self.time, self.n_intdom)?;
        let time_to: Vec<Value> = time.iter().map(|t| (t + dt).min(tmax)).collect();
        self.write_values(self.time_to, &time_to)
    }

    /// `dt_intdom = time_to - time`, broadcast to compartments via `cv_to_intdom`
    pub fn set_dt(&mut self) -> Result<()> {
        let time = self.read_values(self.time, self.n_intdom)?;
        let time_to = self.read_values(self.time_to, self.n_intdom)?;
        let dt_intdom: Vec<Value> = time_to.iter().zip(&time).map(|(to, t)| to - t).collect();
        // cv_to_intdom entries were range-checked at construction
        let dt_cv: Vec<Value> = self
            .cv_to_intdom_h
            .iter()
            .map(|&d| dt_intdom[d as usize])
            .collect();
        self.write_values(self.dt_intdom, &dt_intdom)?;
        self.write_values(self.dt_cv, &dt_cv)
    }

    /// `time = time_to`
    pub fn advance_time(&mut self) -> Result<()> {
        let (space, arenas) = (&self.space, &mut self.arenas);
        arenas.copy_values(space, self.time_to, self.time, self.n_intdom)?;
        Ok(())
    }

    pub fn time_bounds(&self) -> Result<(Value, Value)> {
        Ok(minmax(&self.read_values(self.time, self.n_intdom)?))
    }

    pub fn time_to_bounds(&self) -> Result<(Value, Value)> {
        Ok(minmax(&self.read_values(self.time_to, self.n_intdom)?))
    }

    pub fn voltage_bounds(&self) -> Result<(Value, Value)> {
        Ok(minmax(&self.read_values(self.voltage, self.n_cv)?))
    }

    // === Host access (synchronising) ===

    pub fn read_values(&self, ptr: ValuePtr, len: usize) -> Result<Vec<Value>> {
        Ok(self.arenas.read_values(&self.space, ptr, len)?)
    }

    pub fn read_indices(&self, ptr: IndexPtr, len: usize) -> Result<Vec<Index>> {
        Ok(self.arenas.read_indices(&self.space, ptr, len)?)
    }

    pub fn write_values(&mut self, ptr: ValuePtr, src: &[Value]) -> Result<()> {
        Ok(self.arenas.write_values(&self.space, ptr, src)?)
    }
}

/// `(min, max)`; `(+inf, -inf)` for an empty slice
fn minmax(values: &[Value]) -> (Value, Value) {
    values
        .iter()
        .fold((Value::INFINITY, Value::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

impl<S: ExecutionSpace> fmt::Debug for SharedState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("platform", &self.space.platform_name())
            .field("n_intdom", &self.n_intdom)
            .field("n_cv", &self.n_cv)
            .field("ions", &self.ion_data.len())
            .field("mechanisms", &self.mechanism_ids.len())
            .finish()
    }
}

struct Dump<'a, S: ExecutionSpace> {
    state: &'a SharedState<S>,
    ptr: ValuePtr,
    len: usize,
}

impl<S: ExecutionSpace> fmt::Display for Dump<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.read_values(self.ptr, self.len) {
            Ok(values) => write!(f, "{:?}", values),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}

/// Debug dump of every array (synchronises with the device)
impl<S: ExecutionSpace> fmt::Display for SharedState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dump = |ptr, len| Dump { state: self, ptr, len };
        let (n_d, n_cv) = (self.n_intdom, self.n_cv);

        writeln!(f, " cv_to_intdom {:?}", self.cv_to_intdom_h)?;
        writeln!(f, " time         {}", dump(self.time, n_d))?;
        writeln!(f, " time_to      {}", dump(self.time_to, n_d))?;
        writeln!(f, " dt_intdom    {}", dump(self.dt_intdom, n_d))?;
        writeln!(f, " dt_cv        {}", dump(self.dt_cv, n_cv))?;
        writeln!(f, " voltage      {}", dump(self.voltage, n_cv))?;
        writeln!(f, " init_voltage {}", dump(self.init_voltage, n_cv))?;
        writeln!(f, " temperature  {}", dump(self.temperature_degc, n_cv))?;
        writeln!(f, " diameter     {}", dump(self.diam_um, n_cv))?;
        writeln!(f, " current      {}", dump(self.current_density, n_cv))?;
        writeln!(f, " conductivity {}", dump(self.conductivity, n_cv))?;
        if !self.stimulus.is_empty() {
            let n_accu = self.stimulus.accumulator_cvs().len();
            writeln!(f, " stimulus     {}", dump(self.stimulus.accu_stim, n_accu))?;
        }

        let mut ions: Vec<(&String, &IonState)> = self.ion_data.iter().collect();
        ions.sort_by(|a, b| a.0.cmp(b.0));
        for (name, ion) in ions {
            let n = ion.len();
            writeln!(f, " {}/current_density        {}", name, dump(ion.current_density, n))?;
            writeln!(f, " {}/reversal_potential     {}", name, dump(ion.reversal_potential, n))?;
            writeln!(f, " {}/internal_concentration {}", name, dump(ion.internal_concentration, n))?;
            writeln!(f, " {}/external_concentration {}", name, dump(ion.external_concentration, n))?;
            writeln!(f, " {}/intconc_initial        {}", name, dump(ion.init_iconc, n))?;
            writeln!(f, " {}/extconc_initial        {}", name, dump(ion.init_econc, n))?;
            writeln!(f, " {}/revpot_initial         {}", name, dump(ion.init_revpot, n))?;
            writeln!(f, " {}/node_index             {:?}", name, ion.node_index())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    fn two_domain_state() -> SharedState<CpuBackend> {
        let config = SharedStateConfig {
            n_intdom: 2,
            n_cell: 2,
            n_detector: 1,
            cv_to_intdom: vec![0, 0, 1],
            cv_to_cell: vec![0, 0, 1],
            init_membrane_potential: vec![-65.0, -65.0, -70.0],
            temperature_k: vec![279.45; 3],
            diam_um: vec![1.0, 2.0, 3.0],
            gap_junctions: vec![GapJunction::new(0, 1, 0.5), GapJunction::new(1, 0, 0.5)],
            src_to_spike: vec![1, 0],
        };
        SharedState::new(CpuBackend::new(), config).unwrap()
    }

    #[test]
    fn test_construction() {
        let s = two_domain_state();
        assert_eq!(s.n_cv(), 3);
        assert_eq!(s.read_values(s.voltage, 3).unwrap(), vec![-65.0, -65.0, -70.0]);
        assert_eq!(s.read_values(s.time_since_spike, 2).unwrap(), vec![-1.0, -1.0]);
        let t = s.read_values(s.temperature_degc, 3).unwrap();
        assert!((t[0] - 6.3).abs() < 1e-4);
        assert_eq!(s.read_indices(s.cv_to_cell, 3).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SharedStateConfig::uniform(4, -65.0, 300.0, 1.0);
        config.diam_um.pop();
        assert!(matches!(
            SharedState::new(CpuBackend::new(), config),
            Err(MechanismError::Schema(SchemaError::PlacementMismatch { field: "diam_um", .. }))
        ));

        let mut config = SharedStateConfig::uniform(2, -65.0, 300.0, 1.0);
        config.cv_to_intdom[1] = 1;
        assert!(matches!(
            SharedState::new(CpuBackend::new(), config),
            Err(MechanismError::Runtime(RuntimeError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_time_step_bookkeeping() {
        let mut s = two_domain_state();
        s.update_time_to(0.025, 0.03).unwrap();
        s.set_dt().unwrap();
        assert_eq!(s.read_values(s.dt_cv, 3).unwrap(), vec![0.025; 3]);
        s.advance_time().unwrap();

        // Second step is clamped to tmax
        s.update_time_to(0.025, 0.03).unwrap();
        s.set_dt().unwrap();
        let dt = s.read_values(s.dt_intdom, 2).unwrap();
        assert!((dt[0] - 0.005).abs() < 1e-6);
        s.advance_time().unwrap();
        assert_eq!(s.time_bounds().unwrap(), (0.03, 0.03));
    }

    #[test]
    fn test_ions_and_reset() {
        let mut s = two_domain_state();
        s.add_ion("ca", 2, &IonConfig::uniform(vec![1, 2], 5e-5, 2.0, 132.0)).unwrap();
        let ca = s.ion("ca").unwrap().clone();
        assert_eq!(ca.charge(), 2);
        assert_eq!(ca.node_index(), &[1, 2]);
        assert!(s.read_values(ca.internal_concentration, 2).unwrap()[0].is_nan());

        s.ions_init_concentration().unwrap();
        assert_eq!(s.read_values(ca.external_concentration, 2).unwrap(), vec![2.0, 2.0]);

        s.write_values(s.voltage, &[0.0, 0.0, 0.0]).unwrap();
        s.write_values(ca.current_density, &[1.0, 1.0]).unwrap();
        s.reset().unwrap();
        assert_eq!(s.voltage_bounds().unwrap(), (-70.0, -65.0));
        assert_eq!(s.read_values(ca.current_density, 2).unwrap(), vec![0.0, 0.0]);
        assert_eq!(s.read_values(ca.reversal_potential, 2).unwrap(), vec![132.0, 132.0]);
        assert!(s.to_string().contains("ca/node_index"));
    }

    #[test]
    fn test_duplicate_mechanism_id() {
        let mut s = two_domain_state();
        s.register_mechanism_id(MechanismId(4)).unwrap();
        assert!(matches!(
            s.register_mechanism_id(MechanismId(4)),
            Err(MechanismError::DuplicateId(MechanismId(4)))
        ));
    }

    #[test]
    fn test_base_pack_wires_shared_arrays() {
        let s = two_domain_state();
        let pack = s.base_pack(MechanismId(7), 3, 8);
        assert_eq!(pack.vec_v, s.voltage);
        assert_eq!(pack.vec_ci, s.cv_to_cell);
        assert_eq!(pack.n_detectors, 1);
        assert_eq!(pack.id(), MechanismId(7));
        assert!(pack.weight.is_null());
    }

    #[test]
    fn test_gap_junction_current() {
        let mut s = two_domain_state();
        s.write_values(s.voltage, &[-60.0, -70.0, -70.0]).unwrap();
        s.add_gj_current().unwrap();
        // i[0] -= 0.5 * (-70 - -60), i[1] -= 0.5 * (-60 - -70)
        assert_eq!(s.read_values(s.current_density, 3).unwrap(), vec![5.0, -5.0, 0.0]);
        assert_eq!(s.n_gj(), 2);
    }

    #[test]
    fn test_connectivity_is_range_checked() {
        let mut config = SharedStateConfig::uniform(2, -65.0, 300.0, 1.0)
            .with_gap_junctions(vec![GapJunction::new(0, 2, 1.0)]);
        assert!(config.validate().is_err());

        config.gap_junctions.clear();
        config.n_detector = 1;
        config.src_to_spike = vec![0, 1];
        assert!(config.validate().is_err());
        config.src_to_spike = vec![0];
        assert!(config.validate().is_ok());

        let s = two_domain_state();
        assert_eq!(s.n_spike_source(), 2);
        assert_eq!(s.read_indices(s.src_to_spike, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_stimulus_follows_domain_time() {
        let mut s = two_domain_state();
        let mut stim = StimulusConfig::default();
        stim.push(0, 0.0, 0.0, [(0.0, 1.0), (1.0, 3.0)]);
        stim.push(2, 0.0, 0.0, [(0.0, 1.0), (1.0, 3.0)]);
        s.configure_stimulus(&stim).unwrap();
        s.write_values(s.time, &[0.5, 1.0]).unwrap();

        s.add_stimulus_current().unwrap();
        assert_eq!(s.read_values(s.current_density, 3).unwrap(), vec![-2.0, 0.0, -3.0]);
        assert_eq!(s.read_values(s.stimulus().accu_stim, 2).unwrap(), vec![2.0, 3.0]);

        s.zero_currents().unwrap();
        assert_eq!(s.read_values(s.stimulus().accu_stim, 2).unwrap(), vec![0.0, 0.0]);
        s.reset().unwrap();
        s.add_stimulus_current().unwrap();
        assert_eq!(s.read_values(s.current_density, 3).unwrap(), vec![-1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_stimulus_outside_group_rejected() {
        let mut s = two_domain_state();
        let mut stim = StimulusConfig::default();
        stim.push(3, 0.0, 0.0, [(0.0, 1.0)]);
        assert!(matches!(
            s.configure_stimulus(&stim),
            Err(MechanismError::InvalidStimulus { .. })
        ));
    }

    #[test]
    fn test_take_samples_at_domain_time() {
        let mut s = two_domain_state();
        s.write_values(s.time, &[0.0, 0.5]).unwrap();
        s.write_values(s.time_to, &[0.025, 0.525]).unwrap();

        let mut samples = SampleEventStream::new();
        for (time, intdom, cv, offset) in [(0.0, 0, 0, 0), (0.5, 1, 2, 1), (0.6, 1, 2, 2)] {
            samples.push(SampleEvent { time, intdom, handle: s.voltage.add(cv), offset });
        }
        let (mut times, mut values) = (vec![0.0; 3], vec![0.0; 3]);
        assert_eq!(s.take_samples(&mut samples, &mut times, &mut values).unwrap(), 2);
        assert_eq!(times, vec![0.0, 0.5, 0.0]);
        assert_eq!(values, vec![-65.0, -70.0, 0.0]);
        assert_eq!(samples.len(), 1);

        samples.push(SampleEvent { time: 0.0, intdom: 0, handle: s.voltage, offset: 5 });
        assert!(s.take_samples(&mut samples, &mut times, &mut values).is_err());
    }
}
