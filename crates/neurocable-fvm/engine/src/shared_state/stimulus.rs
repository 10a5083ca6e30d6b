// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Current-clamp stimuli
//!
//! Each stimulus injects a current density shaped by a piecewise-linear
//! envelope, optionally modulated by `sin(2π·f·t + phase)`. Several stimuli
//! may share a compartment; their contributions are summed into one
//! accumulator per distinct compartment (`cv_unique`), which recorders can read.
//!
//! Stimulus evaluation is host-staged: the envelope cursor advances
//! monotonically with time and is rewound by `reset`.

use crate::error::{MechanismError, Result};
use neurocable_mechanism::{index_into, Index, SchemaError, Value, ValuePtr};
use neurocable_runtime::{ArenaSet, ExecutionSpace};
use std::f32::consts::TAU;

/// Stimuli of one cell group, one entry per stimulus unless noted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StimulusConfig {
    /// Compartment of each stimulus
    pub cv: Vec<Index>,
    /// Distinct stimulated compartments, one accumulator each
    pub cv_unique: Vec<Index>,
    /// kHz; zero disables the sinusoid
    pub frequency: Vec<Value>,
    /// Radians
    pub phase: Vec<Value>,
    /// Envelope breakpoints (ms), non-decreasing
    pub envelope_time: Vec<Vec<Value>>,
    /// Current density at each breakpoint (A/m²)
    pub envelope_amplitude: Vec<Vec<Value>>,
}

impl StimulusConfig {
    pub fn len(&self) -> usize {
        self.cv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cv.is_empty()
    }

    /// Append one stimulus on `cv`, registering `cv` as an accumulator if new
    pub fn push(
        &mut self,
        cv: Index,
        frequency: Value,
        phase: Value,
        envelope: impl IntoIterator<Item = (Value, Value)>,
    ) -> &mut Self {
        let (times, amplitudes): (Vec<Value>, Vec<Value>) = envelope.into_iter().unzip();
        self.cv.push(cv);
        if !self.cv_unique.contains(&cv) {
            self.cv_unique.push(cv);
        }
        self.frequency.push(frequency);
        self.phase.push(phase);
        self.envelope_time.push(times);
        self.envelope_amplitude.push(amplitudes);
        self
    }

    fn validate(&self) -> Result<()> {
        let expected = self.cv.len();
        let fields: [(&'static str, usize); 4] = [
            ("frequency", self.frequency.len()),
            ("phase", self.phase.len()),
            ("envelope_time", self.envelope_time.len()),
            ("envelope_amplitude", self.envelope_amplitude.len()),
        ];
        for (field, actual) in fields {
            if actual != expected {
                return Err(SchemaError::PlacementMismatch {
                    context: "stimulus config".to_string(),
                    field,
                    expected,
                    actual,
                }
                .into());
            }
        }
        for (i, (times, amplitudes)) in self.envelope_time.iter().zip(&self.envelope_amplitude).enumerate() {
            if times.len() != amplitudes.len() {
                return Err(MechanismError::InvalidStimulus {
                    stimulus: i,
                    reason: format!("{} envelope times, {} amplitudes", times.len(), amplitudes.len()),
                });
            }
            if times.windows(2).any(|w| w[1] < w[0]) {
                return Err(MechanismError::InvalidStimulus {
                    stimulus: i,
                    reason: "envelope times are not sorted".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StimulusState {
    /// Accumulator of each stimulus
    accu_index: Vec<Index>,
    /// Compartment of each accumulator
    accu_to_cv: Vec<Index>,
    frequency: Vec<Value>,
    phase: Vec<Value>,
    /// Flattened envelopes; stimulus `i` owns `envl_divs[i]..envl_divs[i + 1]`
    envl_amplitudes: Vec<Value>,
    envl_times: Vec<Value>,
    envl_divs: Vec<usize>,
    /// Current envelope segment of each stimulus
    envl_index: Vec<usize>,
    /// Summed stimulus current per accumulator
    pub accu_stim: ValuePtr,
}

impl StimulusState {
    pub(crate) fn new<S: ExecutionSpace>(
        space: &S,
        arenas: &mut ArenaSet<S>,
        config: &StimulusConfig,
        n_cv: usize,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(&cv) = config.cv_unique.iter().find(|&&cv| cv < 0 || cv as usize >= n_cv) {
            return Err(MechanismError::InvalidStimulus {
                stimulus: 0,
                reason: format!("compartment {} is outside the cell group ({} compartments)", cv, n_cv),
            });
        }
        let accu_index = index_into(&config.cv, &config.cv_unique).map_err(|cv| {
            let stimulus = config.cv.iter().position(|&c| c == cv).unwrap_or_default();
            MechanismError::InvalidStimulus {
                stimulus,
                reason: format!("compartment {} is missing from cv_unique", cv),
            }
        })?;

        let mut envl_divs = Vec::with_capacity(config.len() + 1);
        let mut total = 0;
        envl_divs.push(total);
        for times in &config.envelope_time {
            total += times.len();
            envl_divs.push(total);
        }

        Ok(Self {
            accu_index,
            accu_to_cv: config.cv_unique.clone(),
            frequency: config.frequency.clone(),
            phase: config.phase.clone(),
            envl_amplitudes: config.envelope_amplitude.concat(),
            envl_times: config.envelope_time.concat(),
            envl_index: envl_divs[..config.len()].to_vec(),
            envl_divs,
            accu_stim: arenas.push_values(space, &vec![0.0; config.cv_unique.len()])?,
        })
    }

    /// Number of stimuli
    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Stimulated compartments, in accumulator order
    pub fn accumulator_cvs(&self) -> &[Index] {
        &self.accu_to_cv
    }

    pub(crate) fn zero_current<S: ExecutionSpace>(&self, space: &S, arenas: &mut ArenaSet<S>) -> Result<()> {
        if self.accu_to_cv.is_empty() {
            return Ok(());
        }
        arenas.fill_values(space, self.accu_stim, self.accu_to_cv.len(), 0.0)?;
        Ok(())
    }

    /// Zero the accumulators and rewind every envelope
    pub(crate) fn reset<S: ExecutionSpace>(&mut self, space: &S, arenas: &mut ArenaSet<S>) -> Result<()> {
        self.zero_current(space, arenas)?;
        let n = self.len();
        self.envl_index.copy_from_slice(&self.envl_divs[..n]);
        Ok(())
    }

    /// Envelope value of stimulus `i` at `t`, advancing its cursor;
    /// `None` before the first breakpoint or for an empty envelope
    fn envelope_at(&mut self, i: usize, t: Value) -> Option<Value> {
        let (left, right) = (self.envl_divs[i], self.envl_divs[i + 1]);
        if left == right || t < self.envl_times[left] {
            return None;
        }

        let ei = &mut self.envl_index[i];
        while *ei + 1 < right && self.envl_times[*ei + 1] <= t {
            *ei += 1;
        }
        let ei = *ei;

        let j0 = self.envl_amplitudes[ei];
        if ei + 1 == right {
            return Some(j0);
        }
        let (t0, t1) = (self.envl_times[ei], self.envl_times[ei + 1]);
        let u = (t - t0) / (t1 - t0);
        Some(j0 + u * (self.envl_amplitudes[ei + 1] - j0))
    }

    /// Subtract each stimulus from `current_density` at its compartment and
    /// record it in its accumulator; `time` is per integration domain
    pub(crate) fn add_current<S: ExecutionSpace>(
        &mut self,
        space: &S,
        arenas: &mut ArenaSet<S>,
        time: &[Value],
        cv_to_intdom: &[Index],
        current_density: ValuePtr,
        n_cv: usize,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let n_accu = self.accu_to_cv.len();
        let mut current = arenas.read_values(space, current_density, n_cv)?;
        let mut accu = arenas.read_values(space, self.accu_stim, n_accu)?;

        for i in 0..self.len() {
            let ai = self.accu_index[i] as usize;
            let cv = self.accu_to_cv[ai] as usize;
            let t = time[cv_to_intdom[cv] as usize];

            let Some(mut j) = self.envelope_at(i, t) else {
                continue;
            };
            let frequency = self.frequency[i];
            if frequency != 0.0 {
                j *= (TAU * frequency * t + self.phase[i]).sin();
            }
            accu[ai] += j;
            current[cv] -= j;
        }

        arenas.write_values(space, current_density, &current)?;
        arenas.write_values(space, self.accu_stim, &accu)?;
        Ok(())
    }
}
