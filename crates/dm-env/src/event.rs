//! Notifications flowing between components, the environment and sensors.

use dm_core::NameMap;
use serde::{Deserialize, Serialize};

use crate::state::EnvironmentState;

/// Which environment vector a sensor or data source mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Input,
    Observable,
}

/// Component output destined for the environment: `observable[index] = value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub index: usize,
    pub value: f64,
}

impl OutputEvent {
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Read-only snapshot handed to sensors once per step.
///
/// The clock is the value before the step's time increment is applied.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentEvent<'a> {
    state: &'a EnvironmentState,
}

impl<'a> EnvironmentEvent<'a> {
    pub fn new(state: &'a EnvironmentState) -> Self {
        Self { state }
    }

    pub fn clock(&self) -> f64 {
        self.state.clock()
    }

    pub fn input(&self) -> &'a [f64] {
        self.state.input()
    }

    pub fn observable(&self) -> &'a [f64] {
        self.state.observable()
    }

    pub fn values(&self, channel: Channel) -> &'a [f64] {
        match channel {
            Channel::Input => self.state.input(),
            Channel::Observable => self.state.observable(),
        }
    }

    pub fn names(&self, channel: Channel) -> &'a NameMap {
        match channel {
            Channel::Input => self.state.input_names(),
            Channel::Observable => self.state.observable_names(),
        }
    }
}
