//! Read-only observers of environment state.

use core::any::Any;
use core::fmt;
use std::collections::VecDeque;

use crate::error::{EnvError, EnvResult};
use crate::event::{Channel, EnvironmentEvent};

/// Named, indexed listener attached to an environment.
///
/// The index is the sensor's position in the environment's input vector and
/// is assigned by the environment on attachment. `stimulate` runs once per
/// step after the updater and must not mutate the environment.
pub trait Sensor: fmt::Debug {
    fn name(&self) -> &str;

    fn index(&self) -> usize;

    fn set_index(&mut self, index: usize);

    fn stimulate(&mut self, event: &EnvironmentEvent<'_>) -> EnvResult<()>;

    fn reset(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Sensor + '_ {
    /// Concrete view of a sensor, e.g. to read back a recording.
    pub fn downcast_ref<S: Sensor + 'static>(&self) -> Option<&S> {
        self.as_any().downcast_ref::<S>()
    }

    pub fn downcast_mut<S: Sensor + 'static>(&mut self) -> Option<&mut S> {
        self.as_any_mut().downcast_mut::<S>()
    }
}

/// One recorded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub clock: f64,
    pub value: f64,
}

/// Records one element of an environment vector as a time series.
///
/// The element defaults to the sensor's own index.
#[derive(Debug, Clone)]
pub struct RecordingSensor {
    name: String,
    index: usize,
    channel: Channel,
    element: Option<usize>,
    samples: VecDeque<Sample>,
    capacity: Option<usize>,
}

impl RecordingSensor {
    /// Records the input element at this sensor's own index.
    pub fn new(name: impl Into<String>) -> Self {
        Self::on_channel(name, Channel::Input)
    }

    pub fn on_channel(name: impl Into<String>, channel: Channel) -> Self {
        Self {
            name: name.into(),
            index: 0,
            channel,
            element: None,
            samples: VecDeque::new(),
            capacity: None,
        }
    }

    /// Keep only the most recent `capacity` samples.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Record `element` of the channel instead of the sensor's own index.
    pub fn with_element(mut self, element: usize) -> Self {
        self.element = Some(element);
        self
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Position in the channel vector this sensor records.
    pub fn element(&self) -> usize {
        self.element.unwrap_or(self.index)
    }

    pub fn samples(&self) -> impl ExactSizeIterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

impl Sensor for RecordingSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn stimulate(&mut self, event: &EnvironmentEvent<'_>) -> EnvResult<()> {
        let values = event.values(self.channel);
        let element = self.element();
        let value = *values.get(element).ok_or(EnvError::IndexOob {
            what: "recording sensor channel",
            index: element,
            len: values.len(),
        })?;
        if let Some(capacity) = self.capacity {
            while self.samples.len() >= capacity {
                self.samples.pop_front();
            }
        }
        self.samples.push_back(Sample {
            clock: event.clock(),
            value,
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.samples.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
