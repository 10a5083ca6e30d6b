// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deliverable event queue
//!
//! Spike events addressed to one site of one mechanism instance. The queue
//! lives in the shared state; each mechanism drains its own events for the
//! current step window before computing currents.
//!
//! Every event belongs to the integration domain of its target site, and the
//! step window is that domain's `[time, time_to)`. Domains advance
//! independently, so one group-wide cut-off would deliver early.

use neurocable_mechanism::{MechanismId, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliverableEvent {
    /// Delivery time (ms)
    pub time: Value,
    pub mechanism_id: MechanismId,
    /// Site within the target instance (`0..width`)
    pub mech_index: u32,
    pub weight: Value,
    /// Integration domain of the target site
    pub intdom: u32,
}

impl DeliverableEvent {
    /// Event in integration domain 0
    pub fn new(time: Value, mechanism_id: MechanismId, mech_index: u32, weight: Value) -> Self {
        Self {
            time,
            mechanism_id,
            mech_index,
            weight,
            intdom: 0,
        }
    }

    pub fn in_intdom(mut self, intdom: u32) -> Self {
        self.intdom = intdom;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliverableEventStream {
    events: Vec<DeliverableEvent>,
}

impl DeliverableEventStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DeliverableEvent) {
        self.events.push(event);
    }

    /// Remove and return every event for `mechanism_id` with `time < until`,
    /// ordered by time (ties keep insertion order)
    pub fn drain_for(&mut self, mechanism_id: MechanismId, until: Value) -> Vec<DeliverableEvent> {
        self.drain_where(|e| e.mechanism_id == mechanism_id && e.time < until)
    }

    /// Like [`drain_for`](Self::drain_for), with one cut-off per integration
    /// domain: an event is due when `time < until[intdom]`. Events naming a
    /// domain outside `until` stay queued.
    pub fn drain_for_intdoms(&mut self, mechanism_id: MechanismId, until: &[Value]) -> Vec<DeliverableEvent> {
        self.drain_where(|e| {
            e.mechanism_id == mechanism_id
                && until
                    .get(e.intdom as usize)
                    .is_some_and(|&cut_off| e.time < cut_off)
        })
    }

    fn drain_where<F>(&mut self, due: F) -> Vec<DeliverableEvent>
    where
        F: Fn(&DeliverableEvent) -> bool,
    {
        let (mut selected, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.events).into_iter().partition(|e| due(e));
        self.events = pending;
        selected.sort_by(|a, b| a.time.total_cmp(&b.time));
        selected
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: Value, id: u32, mech_index: u32) -> DeliverableEvent {
        DeliverableEvent::new(time, MechanismId(id), mech_index, 1.0)
    }

    #[test]
    fn test_drain_selects_mechanism_and_window() {
        let mut stream = DeliverableEventStream::new();
        stream.push(event(0.5, 0, 0));
        stream.push(event(0.2, 1, 0));
        stream.push(event(1.5, 0, 1));
        stream.push(event(0.1, 0, 2));

        let due = stream.drain_for(MechanismId(0), 1.0);
        assert_eq!(due.iter().map(|e| e.mech_index).collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!(stream.len(), 2);

        // `until` is exclusive
        assert!(stream.drain_for(MechanismId(0), 1.5).is_empty());
        assert_eq!(stream.drain_for(MechanismId(0), 1.6).len(), 1);
    }

    #[test]
    fn test_equal_times_keep_insertion_order() {
        let mut stream = DeliverableEventStream::new();
        for i in 0..4 {
            stream.push(event(0.25, 3, i));
        }
        let due = stream.drain_for(MechanismId(3), 1.0);
        assert_eq!(due.iter().map(|e| e.mech_index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_each_domain_uses_its_own_window() {
        let mut stream = DeliverableEventStream::new();
        stream.push(event(0.3, 0, 0).in_intdom(0));
        stream.push(event(0.3, 0, 1).in_intdom(1));
        stream.push(event(0.05, 0, 2).in_intdom(1));
        stream.push(event(0.01, 0, 3).in_intdom(4));

        // Domain 0 has reached 0.5, domain 1 only 0.1
        let due = stream.drain_for_intdoms(MechanismId(0), &[0.5, 0.1]);
        assert_eq!(due.iter().map(|e| e.mech_index).collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!(stream.len(), 2);

        let due = stream.drain_for_intdoms(MechanismId(0), &[0.5, 0.5]);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].intdom, 1);
        // Unknown domain never comes due
        assert_eq!(stream.len(), 1);
    }
}
