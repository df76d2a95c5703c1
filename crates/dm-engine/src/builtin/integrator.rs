//! Leaky integrate-and-fire unit.

use core::any::Any;

use dm_core::{ensure_finite, ensure_positive};
use dm_env::OutputEvent;
use tracing::trace;

use super::{EXCITE, INHIBIT};
use crate::component::{Component, ComponentCore, StepContext};
use crate::error::{ComponentError, ComponentResult};
use crate::event::Event;

/// Integrates `dv/dt = -v / tau + input` and spikes when `v` reaches `threshold`.
///
/// `input` is the environment input at `input_channel` (zero when unset).
/// [`EXCITE`] and [`INHIBIT`] events move `v` by `weight`. On a spike `v`
/// resets to zero, an [`EXCITE`] event with delay `latency` goes to every
/// connection and `1.0` is written to observable `output_index`; steps without
/// a spike write `0.0` there.
#[derive(Debug, Clone)]
pub struct LeakyIntegrator {
    core: ComponentCore,
    tau: f64,
    threshold: f64,
    weight: f64,
    input_channel: Option<usize>,
    output_index: Option<usize>,
    latency: f64,
    potential: f64,
    spikes: u64,
}

impl LeakyIntegrator {
    pub fn new(
        name: impl Into<String>,
        tau: f64,
        threshold: f64,
        weight: f64,
    ) -> ComponentResult<Self> {
        Ok(Self {
            core: ComponentCore::new(name),
            tau: ensure_positive(tau, "integrator tau")?,
            threshold: ensure_finite(threshold, "integrator threshold")?,
            weight: ensure_finite(weight, "integrator weight")?,
            input_channel: None,
            output_index: None,
            latency: 0.0,
            potential: 0.0,
            spikes: 0,
        })
    }

    pub fn with_input_channel(mut self, channel: usize) -> Self {
        self.input_channel = Some(channel);
        self
    }

    pub fn with_output_index(mut self, index: usize) -> Self {
        self.output_index = Some(index);
        self
    }

    /// Delay of the events sent on a spike; must be finite and non-negative.
    pub fn with_latency(mut self, latency: f64) -> ComponentResult<Self> {
        let latency = ensure_finite(latency, "spike latency")?;
        if latency < 0.0 {
            return Err(ComponentError::InvalidArg {
                what: "spike latency must be non-negative",
            });
        }
        self.latency = latency;
        Ok(self)
    }

    pub fn potential(&self) -> f64 {
        self.potential
    }

    pub fn spikes(&self) -> u64 {
        self.spikes
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn drive(&self, ctx: &StepContext<'_>) -> ComponentResult<f64> {
        let Some(channel) = self.input_channel else {
            return Ok(0.0);
        };
        ctx.environment()
            .input_state()
            .get(channel)
            .copied()
            .ok_or(ComponentError::InvalidArg {
                what: "input channel outside the environment input vector",
            })
    }
}

impl Component for LeakyIntegrator {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn fire(&mut self, event: Event, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        match event.code {
            EXCITE => self.potential += self.weight,
            INHIBIT => self.potential -= self.weight,
            code => {
                return Err(ComponentError::Firing {
                    code,
                    what: "integrator handles EXCITE and INHIBIT only",
                });
            }
        }
        Ok(())
    }

    fn time_elapsed(&mut self, dt: f64, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let input = self.drive(ctx)?;
        self.potential += dt * (-self.potential / self.tau + input);

        let spiked = self.potential >= self.threshold;
        if spiked {
            self.potential = 0.0;
            self.spikes += 1;
            trace!(name = self.core.name(), clock = ctx.clock(), "spike");
            ctx.broadcast(self.core.connections(), Event::new(EXCITE, self.latency));
        }
        if let Some(index) = self.output_index {
            let value = if spiked { 1.0 } else { 0.0 };
            ctx.output(OutputEvent::new(index, value));
        }
        Ok(())
    }

    fn reset_state(&mut self) {
        self.potential = 0.0;
        self.spikes = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
