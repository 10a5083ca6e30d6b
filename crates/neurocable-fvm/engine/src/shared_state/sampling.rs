// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sample events for recorded values
//!
//! A sample event asks for the value behind `handle` (any value pointer in
//! the cell group's arena) to be recorded at `offset` of the caller's sample
//! buffers. Events are taken at the start of the step that contains them,
//! using the time of their integration domain.

use neurocable_mechanism::{Value, ValuePtr};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleEvent {
    /// Requested sample time (ms)
    pub time: Value,
    pub intdom: u32,
    /// Value to sample
    pub handle: ValuePtr,
    /// Slot in the sample time/value buffers
    pub offset: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SampleEventStream {
    events: Vec<SampleEvent>,
}

impl SampleEventStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SampleEvent) {
        self.events.push(event);
    }

    /// Remove and return the events with `time < until[intdom]`, in time order
    pub fn drain_due(&mut self, until: &[Value]) -> Vec<SampleEvent> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|e| until.get(e.intdom as usize).is_some_and(|&t| e.time < t));
        self.events = pending;
        due.sort_by(|a, b| a.time.total_cmp(&b.time));
        due
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

    fn sample(time: Value, intdom: u32, offset: u32) -> SampleEvent {
        SampleEvent {
            time,
            intdom,
            handle: ValuePtr::at(0),
            offset,
        }
    }

    #[test]
    fn test_drain_due_per_domain() {
        let mut stream = SampleEventStream::new();
        stream.push(sample(0.2, 0, 0));
        stream.push(sample(0.2, 1, 1));
        stream.push(sample(0.0, 1, 2));

        let due = stream.drain_due(&[0.1, 0.3]);
        assert_eq!(due.iter().map(|e| e.offset).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(stream.len(), 1);
        stream.clear();
        assert!(stream.is_empty());
    }
}
