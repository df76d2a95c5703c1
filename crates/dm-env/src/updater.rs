//! Pluggable environment dynamics.
//!
//! An [`Updater`] computes the next environment state from the elapsed time.
//! Each environment variant accepts only updaters that expose the capability it
//! drives; [`SimpleEnvironment`](crate::SimpleEnvironment) asks for
//! [`SimpleUpdater`] through [`Updater::as_simple`].

use core::fmt;

use dm_core::ensure_positive;

use crate::error::EnvResult;
use crate::state::EnvironmentState;

/// Strategy object owned by an environment.
pub trait Updater: fmt::Debug {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Clear any internal state (called when the environment resets).
    fn reset(&mut self) {}

    /// Capability query for simple environments; `None` if unsupported.
    fn as_simple(&mut self) -> Option<&mut dyn SimpleUpdater> {
        None
    }
}

/// Dynamics over a plain [`EnvironmentState`].
pub trait SimpleUpdater {
    /// Advance `state` by `dt`. The clock still holds the pre-step value.
    fn update(&mut self, state: &mut EnvironmentState, dt: f64) -> EnvResult<()>;
}

/// Leaves the state untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUpdater;

impl Updater for NullUpdater {
    fn name(&self) -> &str {
        "none"
    }

    fn as_simple(&mut self) -> Option<&mut dyn SimpleUpdater> {
        Some(self)
    }
}

impl SimpleUpdater for NullUpdater {
    fn update(&mut self, _state: &mut EnvironmentState, _dt: f64) -> EnvResult<()> {
        Ok(())
    }
}

/// Linear driving signals on the input vector.
///
/// `input[i] = offsets[i] + slopes[i] * t` where `t` is the clock at the end of
/// the step. Only inputs with at least one coefficient are driven; a missing
/// coefficient counts as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearUpdater {
    pub slopes: Vec<f64>,
    pub offsets: Vec<f64>,
}

impl LinearUpdater {
    pub fn new(slopes: Vec<f64>, offsets: Vec<f64>) -> Self {
        Self { slopes, offsets }
    }

    fn driven(&self) -> usize {
        self.slopes.len().max(self.offsets.len())
    }
}

impl Updater for LinearUpdater {
    fn name(&self) -> &str {
        "linear"
    }

    fn as_simple(&mut self) -> Option<&mut dyn SimpleUpdater> {
        Some(self)
    }
}

impl SimpleUpdater for LinearUpdater {
    fn update(&mut self, state: &mut EnvironmentState, dt: f64) -> EnvResult<()> {
        let t = state.clock() + dt;
        let driven = self.driven();
        for (i, value) in state.input_mut().iter_mut().enumerate().take(driven) {
            let slope = self.slopes.get(i).copied().unwrap_or(0.0);
            let offset = self.offsets.get(i).copied().unwrap_or(0.0);
            *value = offset + slope * t;
        }
        Ok(())
    }
}

/// Exponential relaxation of every observable toward zero.
///
/// `obs[i] *= exp(-dt / tau)`
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationUpdater {
    tau: f64,
}

impl RelaxationUpdater {
    /// `tau` must be finite and positive.
    pub fn new(tau: f64) -> EnvResult<Self> {
        let tau = ensure_positive(tau, "relaxation tau")?;
        Ok(Self { tau })
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }
}

impl Updater for RelaxationUpdater {
    fn name(&self) -> &str {
        "relaxation"
    }

    fn as_simple(&mut self) -> Option<&mut dyn SimpleUpdater> {
        Some(self)
    }
}

impl SimpleUpdater for RelaxationUpdater {
    fn update(&mut self, state: &mut EnvironmentState, dt: f64) -> EnvResult<()> {
        let factor = (-dt / self.tau).exp();
        for value in state.observable_mut() {
            *value *= factor;
        }
        Ok(())
    }
}
