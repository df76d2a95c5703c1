//! Periodic event source.

use core::any::Any;

use dm_core::{DUE_EPSILON, ensure_positive};

use crate::component::{Component, ComponentCore, StepContext};
use crate::error::{ComponentError, ComponentResult};
use crate::event::Event;

/// Emits a zero-delay event with `code` to every connection once per `period`.
#[derive(Debug, Clone)]
pub struct PulseGenerator {
    core: ComponentCore,
    period: f64,
    code: i32,
    /// Time since the last pulse.
    elapsed: f64,
    pulses: u64,
}

impl PulseGenerator {
    pub fn new(name: impl Into<String>, period: f64, code: i32) -> ComponentResult<Self> {
        let period = ensure_positive(period, "pulse period")?;
        Ok(Self {
            core: ComponentCore::new(name),
            period,
            code,
            elapsed: 0.0,
            pulses: 0,
        })
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    /// Pulses emitted since the last reset.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }
}

impl Component for PulseGenerator {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn fire(&mut self, event: Event, _ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        Err(ComponentError::Firing {
            code: event.code,
            what: "pulse generator accepts no events",
        })
    }

    fn time_elapsed(&mut self, dt: f64, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        self.elapsed += dt;
        while self.elapsed >= self.period - DUE_EPSILON {
            self.elapsed -= self.period;
            self.pulses += 1;
            ctx.broadcast(self.core.connections(), Event::immediate(self.code));
        }
        Ok(())
    }

    fn reset_state(&mut self) {
        self.elapsed = 0.0;
        self.pulses = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use dm_core::ComponentId;
    use dm_env::SimpleEnvironment;

    use super::*;

    #[test]
    fn rejects_bad_period() {
        assert!(PulseGenerator::new("p", 0.0, 1).is_err());
        assert!(PulseGenerator::new("p", f64::NAN, 1).is_err());
    }

    #[test]
    fn pulses_once_per_period() {
        let env = SimpleEnvironment::new();
        let target = ComponentId::new(9).unwrap();
        let mut pulse = PulseGenerator::new("p", 0.3, 4).unwrap();
        pulse.add_connection(target);

        let mut emitted = 0;
        for _ in 0..10 {
            let mut ctx = StepContext::new(&env, None, 0.0, 0.1);
            pulse.time_elapsed(0.1, &mut ctx).unwrap();
            emitted += ctx.pending_events().len();
        }
        // pulses at 0.3, 0.6, 0.9
        assert_eq!(emitted, 3);
        assert_eq!(pulse.pulses(), 3);

        pulse.reset();
        assert_eq!(pulse.pulses(), 0);
    }

    #[test]
    fn firing_is_an_error() {
        let env = SimpleEnvironment::new();
        let mut ctx = StepContext::new(&env, None, 0.0, 1.0);
        let mut pulse = PulseGenerator::new("p", 1.0, 1).unwrap();
        let err = pulse.fire(Event::immediate(1), &mut ctx).unwrap_err();
        assert!(matches!(err, ComponentError::Firing { code: 1, .. }));
    }
}
