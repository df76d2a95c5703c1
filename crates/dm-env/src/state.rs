//! State vectors, labels and clock of an environment.

use dm_core::NameMap;

use crate::error::{EnvError, EnvResult};

const INPUT_PREFIX: &str = "Input";
const OBSERVABLE_PREFIX: &str = "Observable";

/// Input/observable vectors plus the environment clock.
///
/// The input length is owned by the environment (one element per sensor);
/// updaters and callers may change values but never the input length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentState {
    input: Vec<f64>,
    observable: Vec<f64>,
    clock: f64,
    input_names: NameMap,
    observable_names: NameMap,
    input_names_explicit: bool,
}

impl EnvironmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn input(&self) -> &[f64] {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    pub fn input_value(&self, index: usize) -> Option<f64> {
        self.input.get(index).copied()
    }

    /// Replace every input value; the length must match the sensor count.
    pub fn set_input_state(&mut self, values: &[f64]) -> EnvResult<()> {
        if values.len() != self.input.len() {
            return Err(EnvError::SizeMismatch {
                what: "input state",
                expected: self.input.len(),
                actual: values.len(),
            });
        }
        self.input.copy_from_slice(values);
        Ok(())
    }

    pub fn set_input_value(&mut self, index: usize, value: f64) -> EnvResult<()> {
        let len = self.input.len();
        let slot = self.input.get_mut(index).ok_or(EnvError::IndexOob {
            what: "input state",
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    pub fn observable(&self) -> &[f64] {
        &self.observable
    }

    pub fn observable_mut(&mut self) -> &mut [f64] {
        &mut self.observable
    }

    pub fn observable_value(&self, index: usize) -> Option<f64> {
        self.observable.get(index).copied()
    }

    /// Replace the observable vector (and its size).
    pub fn set_observable_state(&mut self, values: &[f64]) {
        self.observable = values.to_vec();
        self.observable_names
            .fill_defaults(self.observable.len(), OBSERVABLE_PREFIX);
    }

    pub fn set_observable_value(&mut self, index: usize, value: f64) -> EnvResult<()> {
        let len = self.observable.len();
        let slot = self.observable.get_mut(index).ok_or(EnvError::IndexOob {
            what: "observable state",
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    /// Resize the observable vector to `size` zeroed elements.
    pub fn set_observable_size(&mut self, size: usize) {
        self.observable = vec![0.0; size];
        self.observable_names.fill_defaults(size, OBSERVABLE_PREFIX);
    }

    pub fn input_names(&self) -> &NameMap {
        &self.input_names
    }

    pub fn observable_names(&self) -> &NameMap {
        &self.observable_names
    }

    /// Label one input; labels set this way survive sensor changes.
    pub fn set_input_name(&mut self, index: usize, name: impl Into<String>) {
        self.input_names.set(index, name);
        self.input_names_explicit = true;
    }

    pub fn set_input_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_names = NameMap::from_names(names);
        self.input_names.fill_defaults(self.input.len(), INPUT_PREFIX);
        self.input_names_explicit = true;
    }

    pub fn set_observable_name(&mut self, index: usize, name: impl Into<String>) {
        self.observable_names.set(index, name);
    }

    pub fn set_observable_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observable_names = NameMap::from_names(names);
    }

    pub fn remove_observable_name(&mut self, name: &str) -> bool {
        self.observable_names.remove_name(name)
    }

    /// `observable[i] - other[i]` over the common length.
    pub fn deltas(&self, other: &[f64]) -> Vec<f64> {
        self.observable
            .iter()
            .zip(other)
            .map(|(env, cmp)| env - cmp)
            .collect()
    }

    pub fn squared_deltas(&self, other: &[f64]) -> Vec<f64> {
        self.deltas(other).into_iter().map(|d| d * d).collect()
    }

    /// Grow the input vector by one zeroed element.
    pub(crate) fn push_input(&mut self) {
        self.input.push(0.0);
        self.refresh_input_names();
    }

    /// Drop the input element at `index`, shifting later ones down.
    pub(crate) fn remove_input(&mut self, index: usize) {
        if index < self.input.len() {
            self.input.remove(index);
        }
        if self.input_names_explicit {
            self.input_names.remove_and_shift(index);
        }
        self.refresh_input_names();
    }

    fn refresh_input_names(&mut self) {
        if self.input_names_explicit {
            self.input_names.fill_defaults(self.input.len(), INPUT_PREFIX);
        } else {
            self.input_names = NameMap::with_defaults(self.input.len(), INPUT_PREFIX);
        }
    }

    pub(crate) fn advance_clock(&mut self, dt: f64) {
        self.clock += dt;
    }

    /// Zero both vectors (keeping their sizes) and the clock.
    pub(crate) fn reset(&mut self) {
        self.clock = 0.0;
        self.input.fill(0.0);
        self.observable.fill(0.0);
    }
}
