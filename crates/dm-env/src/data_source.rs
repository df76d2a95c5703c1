//! Environment vectors mirrored as named scalar channels.
//!
//! A data source copies one environment vector into its own signal buffer on
//! every stimulation and notifies its listeners (plotting or logging consumers).
//! It never writes back to the environment.

use core::any::Any;
use core::fmt;

use dm_core::{ListenerId, ListenerSet, NameMap};

use crate::error::EnvResult;
use crate::event::{Channel, EnvironmentEvent};
use crate::sensor::Sensor;

/// Payload of a "data changed" notification.
#[derive(Debug, Clone, Copy)]
pub struct DataEmission<'a> {
    pub channel: Channel,
    pub clock: f64,
    pub signal: &'a [f64],
    pub names: &'a NameMap,
}

/// Consumer of data source notifications.
pub trait DataSourceListener {
    fn data_emitted(&mut self, emission: &DataEmission<'_>);

    fn data_reset(&mut self, _channel: Channel) {}
}

impl<F> DataSourceListener for F
where
    F: FnMut(&DataEmission<'_>),
{
    fn data_emitted(&mut self, emission: &DataEmission<'_>) {
        self(emission)
    }
}

/// Mirror of the input or observable vector, one channel per element.
pub struct EnvironmentDataSource {
    channel: Channel,
    index: usize,
    names: NameMap,
    signal: Vec<f64>,
    clock: f64,
    listeners: ListenerSet<dyn DataSourceListener>,
}

impl fmt::Debug for EnvironmentDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentDataSource")
            .field("channel", &self.channel)
            .field("index", &self.index)
            .field("signal", &self.signal)
            .field("clock", &self.clock)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EnvironmentDataSource {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            index: 0,
            names: NameMap::new(),
            signal: Vec::new(),
            clock: 0.0,
            listeners: ListenerSet::new(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    /// Value of one channel; `None` past the end of the signal.
    pub fn value(&self, channel_index: usize) -> Option<f64> {
        self.signal.get(channel_index).copied()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.names.names()
    }

    pub fn set_channel_names(&mut self, names: NameMap) {
        self.names = names;
    }

    pub fn channel_count(&self) -> usize {
        self.signal.len()
    }

    pub fn add_listener(&mut self, listener: impl DataSourceListener + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    /// Detach the listener behind `id`. Returns false if it was not attached.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn fire_emission(&mut self) {
        let emission = DataEmission {
            channel: self.channel,
            clock: self.clock,
            signal: &self.signal,
            names: &self.names,
        };
        for listener in self.listeners.iter_mut() {
            listener.data_emitted(&emission);
        }
    }

    fn fire_reset(&mut self) {
        let channel = self.channel;
        for listener in self.listeners.iter_mut() {
            listener.data_reset(channel);
        }
    }
}

impl Sensor for EnvironmentDataSource {
    fn name(&self) -> &str {
        match self.channel {
            Channel::Input => "input data",
            Channel::Observable => "observable data",
        }
    }

    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn stimulate(&mut self, event: &EnvironmentEvent<'_>) -> EnvResult<()> {
        let values = event.values(self.channel);
        self.signal.clear();
        self.signal.extend_from_slice(values);
        self.clock = event.clock();
        let names = event.names(self.channel);
        if self.names != *names {
            self.names = names.clone();
        }
        self.fire_emission();
        Ok(())
    }

    fn reset(&mut self) {
        self.signal.fill(0.0);
        self.clock = 0.0;
        self.fire_reset();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EnvironmentState;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn mirrors_without_touching_state() {
        let mut state = EnvironmentState::new();
        state.set_observable_names(["a", "b"]);
        state.set_observable_state(&[0.25, 0.5]);
        let before = state.clone();

        let mut source = EnvironmentDataSource::new(Channel::Observable);
        source.stimulate(&EnvironmentEvent::new(&state)).unwrap();

        assert_eq!(source.signal(), &[0.25, 0.5]);
        assert_eq!(source.channel_names(), vec!["a", "b"]);
        assert_eq!(state, before);
    }

    #[test]
    fn listeners_see_emissions_and_resets() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut state = EnvironmentState::new();
        state.set_observable_state(&[3.0]);
        let mut source = EnvironmentDataSource::new(Channel::Observable);
        source.add_listener(move |e: &DataEmission<'_>| {
            sink.borrow_mut().push((e.clock, e.signal.to_vec()));
        });

        source.stimulate(&EnvironmentEvent::new(&state)).unwrap();
        state.advance_clock(0.5);
        source.stimulate(&EnvironmentEvent::new(&state)).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(0.0, vec![3.0]), (0.5, vec![3.0])]
        );

        source.reset();
        assert_eq!(source.signal(), &[0.0]);
        assert_eq!(source.clock(), 0.0);
    }

    #[test]
    fn removed_listener_stops_hearing() {
        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));
        let (a, b) = (Rc::clone(&first), Rc::clone(&second));

        let state = EnvironmentState::new();
        let mut source = EnvironmentDataSource::new(Channel::Input);
        let keep = source.add_listener(move |_: &DataEmission<'_>| *a.borrow_mut() += 1);
        let drop = source.add_listener(move |_: &DataEmission<'_>| *b.borrow_mut() += 1);

        source.stimulate(&EnvironmentEvent::new(&state)).unwrap();
        assert!(source.remove_listener(drop));
        assert!(!source.remove_listener(drop));
        source.stimulate(&EnvironmentEvent::new(&state)).unwrap();

        assert_eq!((*first.borrow(), *second.borrow()), (2, 1));
        assert_eq!(source.listener_count(), 1);
        assert!(source.remove_listener(keep));
    }
}
