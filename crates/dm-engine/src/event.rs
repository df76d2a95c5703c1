//! Discrete causal events and per-component event queues.

use std::collections::VecDeque;

use dm_core::DUE_EPSILON;
use serde::{Deserialize, Serialize};

/// A delayed message with a consumer-defined type code.
///
/// `delay` is the time remaining until the event is due, in the engine's
/// time-step units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub code: i32,
    pub delay: f64,
}

impl Event {
    pub fn new(code: i32, delay: f64) -> Self {
        Self { code, delay }
    }

    /// Due on the next firing pass.
    pub fn immediate(code: i32) -> Self {
        Self::new(code, 0.0)
    }

    pub fn is_due(&self) -> bool {
        self.delay <= DUE_EPSILON
    }
}

/// FIFO of pending events.
///
/// Events are appended at the tail; there is no delay-ordered insertion, so
/// events that fall due in the same pass come out in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Age every event by `dt` and remove the ones that fell due.
    ///
    /// Due events are returned in queue order; the rest keep their order.
    pub fn elapse(&mut self, dt: f64) -> Vec<Event> {
        let mut due = Vec::new();
        self.events.retain_mut(|event| {
            event.delay -= dt;
            if event.is_due() {
                due.push(*event);
                false
            } else {
                true
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fires_after_cumulative_delay() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 0.2));

        assert!(queue.elapse(0.1).is_empty());
        let due = queue.elapse(0.1);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].code, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn due_events_keep_insertion_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(10, 0.9));
        queue.push(Event::new(20, 0.1));
        queue.push(Event::new(30, 5.0));
        queue.push(Event::new(40, 0.5));

        let codes: Vec<i32> = queue.elapse(1.0).into_iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![10, 20, 40]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drift_below_epsilon_is_due() {
        let mut queue = EventQueue::new();
        queue.push(Event::new(1, 0.3));
        let mut fired = 0;
        for _ in 0..3 {
            fired += queue.elapse(0.1).len();
        }
        assert_eq!(fired, 1);
    }

    proptest! {
        #[test]
        fn every_event_fires_exactly_once(delays in prop::collection::vec(0.0_f64..10.0, 0..32), dt in 0.05_f64..1.0) {
            let mut queue = EventQueue::new();
            for (code, delay) in delays.iter().enumerate() {
                queue.push(Event::new(code as i32, *delay));
            }
            let mut fired = Vec::new();
            let steps = (10.0 / dt).ceil() as usize + 1;
            for _ in 0..steps {
                fired.extend(queue.elapse(dt).into_iter().map(|e| e.code));
            }
            prop_assert!(queue.is_empty());
            fired.sort_unstable();
            let expected: Vec<i32> = (0..delays.len() as i32).collect();
            prop_assert_eq!(fired, expected);
        }
    }
}
