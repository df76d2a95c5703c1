//! Progress lines and the end-of-run summary.

use dm_core::ComponentId;
use dm_engine::builtin::{LeakyIntegrator, PulseGenerator};
use dm_engine::{Component, Engine, FiringFailure};
use dm_env::{Environment, RecordingSensor};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub iterations: u64,
    pub clock: f64,
    pub observable: Vec<NamedValue>,
    pub components: Vec<ComponentSummary>,
    pub sensors: Vec<SensorSummary>,
    pub firing_failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub id: Option<ComponentId>,
    pub name: String,
    pub pending_events: usize,
    /// Pulses or spikes emitted, for built-in components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emitted: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorSummary {
    pub index: usize,
    pub name: String,
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub iteration: u64,
    pub id: ComponentId,
    pub component: String,
    pub phase: String,
    pub error: String,
}

impl From<&FiringFailure> for FailureSummary {
    fn from(failure: &FiringFailure) -> Self {
        Self {
            iteration: failure.iteration,
            id: failure.id,
            component: failure.name.clone(),
            phase: failure.phase.to_string(),
            error: failure.error.to_string(),
        }
    }
}

pub fn summarize(engine: &Engine, failures: &[FiringFailure]) -> RunSummary {
    let observable = engine.environment().map(named_observables).unwrap_or_default();
    let components = engine
        .model()
        .map(|m| m.components().map(component_summary).collect())
        .unwrap_or_default();
    let sensors = engine.environment().map(sensor_summaries).unwrap_or_default();

    RunSummary {
        iterations: engine.iterations(),
        clock: engine.clock(),
        observable,
        components,
        sensors,
        firing_failures: failures.iter().map(FailureSummary::from).collect(),
    }
}

fn named_observables(env: &dyn Environment) -> Vec<NamedValue> {
    let names = env.state().observable_names();
    env.observable_state()
        .iter()
        .enumerate()
        .map(|(i, value)| NamedValue {
            name: names
                .get(i)
                .map_or_else(|| format!("Observable[{i}]"), str::to_string),
            value: *value,
        })
        .collect()
}

fn component_summary(component: &dyn Component) -> ComponentSummary {
    let emitted = component
        .downcast_ref::<LeakyIntegrator>()
        .map(LeakyIntegrator::spikes)
        .or_else(|| {
            component
                .downcast_ref::<PulseGenerator>()
                .map(PulseGenerator::pulses)
        });
    ComponentSummary {
        id: component.id(),
        name: component.name().to_string(),
        pending_events: component.core().queue().len(),
        emitted,
    }
}

fn sensor_summaries(env: &dyn Environment) -> Vec<SensorSummary> {
    (0..env.sensor_count())
        .filter_map(|i| env.sensor(i))
        .map(|sensor| {
            let recording = sensor.downcast_ref::<RecordingSensor>();
            SensorSummary {
                index: sensor.index(),
                name: sensor.name().to_string(),
                samples: recording.map_or(0, RecordingSensor::len),
                last: recording.and_then(RecordingSensor::last).map(|s| s.value),
            }
        })
        .collect()
}

/// One progress line: iteration, clock and the observable vector.
pub fn progress_line(engine: &Engine) -> String {
    let observable = engine
        .environment()
        .map(|env| {
            env.observable_state()
                .iter()
                .map(|v| format!("{v:.4}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    format!(
        "iter {:>8}  t = {:>10.4}  observable = [{}]",
        engine.iterations(),
        engine.clock(),
        observable
    )
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run Summary ===");
    println!("Iterations: {}", summary.iterations);
    println!("Clock: {:.6}", summary.clock);
    if !summary.observable.is_empty() {
        println!("Observables:");
        for named in &summary.observable {
            println!("  {:<20} {:.6}", named.name, named.value);
        }
    }
    println!("Components:");
    for c in &summary.components {
        let emitted = c.emitted.map(|n| format!(", emitted {n}")).unwrap_or_default();
        let id = c.id.map(|id| id.to_string()).unwrap_or_default();
        println!(
            "  {:<5} {:<20} pending {}{}",
            id, c.name, c.pending_events, emitted
        );
    }
    if !summary.sensors.is_empty() {
        println!("Sensors:");
        for s in &summary.sensors {
            let last = s.last.map(|v| format!(", last {v:.6}")).unwrap_or_default();
            println!("  [{}] {:<20} {} samples{}", s.index, s.name, s.samples, last);
        }
    }
    if summary.firing_failures.is_empty() {
        println!("Firing failures: none");
    } else {
        println!("Firing failures: {}", summary.firing_failures.len());
        for f in &summary.firing_failures {
            println!(
                "  iter {} {} {} ({}): {}",
                f.iteration, f.id, f.component, f.phase, f.error
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_engine::{Event, Model};

    #[test]
    fn summary_reports_builtins_and_sensors() {
        let model = Model::simple("s")
            .with_component(Box::new(PulseGenerator::new("clock", 0.5, 1).unwrap()))
            .with_component(Box::new(
                LeakyIntegrator::new("cell", 1.0, 1.0, 0.5).unwrap(),
            ));
        let mut engine = Engine::new(0.25).unwrap().with_model(model);
        engine
            .environment_mut()
            .unwrap()
            .add_sensor(Box::new(RecordingSensor::new("drive")));
        let cell = engine.component_ids()[1];
        engine.add_event(cell, Event::new(1, 10.0)).unwrap();

        let report = engine.execute_model(4).unwrap();
        let summary = summarize(&engine, &report.failures);

        assert_eq!(summary.iterations, 4);
        assert_eq!(summary.components[0].emitted, Some(2));
        assert_eq!(summary.components[1].pending_events, 1);
        assert_eq!(summary.sensors[0].samples, 4);
        assert!(summary.firing_failures.is_empty());

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"clock\""));
        // ids serialize as bare numbers
        assert!(json.contains("\"id\":1,"));
        assert!(progress_line(&engine).contains("iter"));
    }
}
