// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of a mechanism instance
//!
//! `Created -> Instantiated -> Initialized -> Stepping*`. A failed
//! instantiation parks the instance in `Failed`; nothing can run on it
//! afterwards. Every step entry point refreshes the pack's time pointer and
//! leaves every other pointer untouched.

use super::{Mechanism, MechanismKernels};
use crate::error::{MechanismError, Result};
use crate::shared_state::{DeliverableEvent, SharedState};
use neurocable_mechanism::{ParameterPack, Value};
use neurocable_runtime::{ArenaSet, ExecutionSpace};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    Instantiated,
    Initialized,
    Stepping,
    Failed,
}

impl LifecycleState {
    /// Storage is bound and pointers are valid
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            LifecycleState::Instantiated | LifecycleState::Initialized | LifecycleState::Stepping
        )
    }

    /// Step kernels may run
    pub fn is_runnable(self) -> bool {
        matches!(self, LifecycleState::Initialized | LifecycleState::Stepping)
    }
}

impl<S: ExecutionSpace> Mechanism<S> {
    pub(crate) fn lifecycle_error(&self, operation: &'static str) -> MechanismError {
        MechanismError::Lifecycle {
            mechanism: self.name().to_string(),
            operation,
            state: self.state,
        }
    }

    pub(crate) fn require_bound(&self, operation: &'static str) -> Result<()> {
        if self.state.is_bound() {
            Ok(())
        } else {
            Err(self.lifecycle_error(operation))
        }
    }

    fn require_runnable(&self, operation: &'static str) -> Result<()> {
        if self.state.is_runnable() {
            Ok(())
        } else {
            Err(self.lifecycle_error(operation))
        }
    }

    /// Run the initial-value kernel, then scale state by multiplicity
    ///
    /// May be repeated (e.g. after a reset of the shared state).
    pub fn initialize(&mut self, shared: &mut SharedState<S>) -> Result<()> {
        self.require_bound("initialize")?;
        self.pack.vec_t = shared.time;

        let width = self.width();
        if width > 0 {
            let (space, arenas) = shared.split_mut();
            self.kernels.init_mechanism(&self.pack, space, arenas)?;
            if self.pack.uses_multiplicity() {
                for &state_var in &self.state_vars_h {
                    arenas.multiply_in_place(space, state_var, self.pack.multiplicity, width)?;
                }
            }
        }

        self.state = LifecycleState::Initialized;
        trace!("{} initialized", self.name());
        Ok(())
    }

    pub fn update_current(&mut self, shared: &mut SharedState<S>) -> Result<()> {
        self.step_with(shared, "update_current", |k, p, s, a| k.compute_currents(p, s, a))
    }

    pub fn update_state(&mut self, shared: &mut SharedState<S>) -> Result<()> {
        self.step_with(shared, "update_state", |k, p, s, a| k.advance_state(p, s, a))
    }

    pub fn update_ions(&mut self, shared: &mut SharedState<S>) -> Result<()> {
        self.step_with(shared, "update_ions", |k, p, s, a| k.write_ions(p, s, a))
    }

    pub fn post_event(&mut self, shared: &mut SharedState<S>) -> Result<()> {
        self.step_with(shared, "post_event", |k, p, s, a| k.post_event(p, s, a))
    }

    /// Hand this instance's events with `time < until` to its kernels;
    /// returns how many were delivered
    pub fn deliver_events(&mut self, shared: &mut SharedState<S>, until: Value) -> Result<usize> {
        self.require_runnable("deliver_events")?;
        let events = shared.events_mut().drain_for(self.id(), until);
        self.apply_events(shared, events)
    }

    /// Per-domain variant of [`deliver_events`](Self::deliver_events):
    /// `until[d]` is the end of integration domain `d`'s window
    pub fn deliver_events_by_intdom(&mut self, shared: &mut SharedState<S>, until: &[Value]) -> Result<usize> {
        self.require_runnable("deliver_events")?;
        let events = shared.events_mut().drain_for_intdoms(self.id(), until);
        self.apply_events(shared, events)
    }

    fn apply_events(&mut self, shared: &mut SharedState<S>, events: Vec<DeliverableEvent>) -> Result<usize> {
        self.pack.vec_t = shared.time;
        self.state = LifecycleState::Stepping;
        if events.is_empty() || self.width() == 0 {
            return Ok(events.len());
        }
        let (space, arenas) = shared.split_mut();
        self.kernels.apply_events(&self.pack, &events, space, arenas)?;
        Ok(events.len())
    }

    fn step_with<F>(&mut self, shared: &mut SharedState<S>, operation: &'static str, kernel: F) -> Result<()>
    where
        F: FnOnce(&dyn MechanismKernels<S>, &ParameterPack, &S, &mut ArenaSet<S>) -> Result<()>,
    {
        self.require_runnable(operation)?;
        self.pack.vec_t = shared.time;
        self.state = LifecycleState::Stepping;
        if self.width() == 0 {
            return Ok(());
        }
        let (space, arenas) = shared.split_mut();
        kernel(self.kernels.as_ref(), &self.pack, space, arenas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!LifecycleState::Created.is_bound());
        assert!(LifecycleState::Instantiated.is_bound());
        assert!(!LifecycleState::Instantiated.is_runnable());
        assert!(LifecycleState::Stepping.is_runnable());
        assert!(!LifecycleState::Failed.is_bound());
    }
}
