//! YAML run configuration and its validation.

use std::collections::HashSet;
use std::path::Path;

use dm_engine::FiringErrorPolicy;
use dm_env::{Channel, UpdaterRegistry, UpdaterSpec};
use serde::{Deserialize, Serialize};

use crate::error::{CliResult, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub time_step: f64,
    pub iterations: u64,
    /// Iterations per `execute_model` call; progress is printed between calls.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
    #[serde(default)]
    pub firing_errors: FiringErrorPolicy,
    #[serde(default)]
    pub environment: EnvironmentDef,
    #[serde(default)]
    pub sensors: Vec<SensorDef>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

fn default_report_every() -> u64 {
    100
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDef {
    /// One observable per name.
    #[serde(default)]
    pub observable_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<UpdaterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDef {
    pub name: String,
    #[serde(default = "default_channel")]
    pub channel: Channel,
    /// Element of `channel` to record; defaults to the sensor's position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<usize>,
}

fn default_channel() -> Channel {
    Channel::Input
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    PulseGenerator {
        period: f64,
        #[serde(default = "default_code")]
        code: i32,
    },
    LeakyIntegrator {
        tau: f64,
        threshold: f64,
        weight: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_channel: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_index: Option<usize>,
        #[serde(default)]
        latency: f64,
    },
}

fn default_code() -> i32 {
    dm_engine::builtin::EXCITE
}

pub fn load_config(path: &Path) -> CliResult<RunConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_yaml::from_str(&content)?;
    validate_config(&config, &UpdaterRegistry::default())?;
    Ok(config)
}

/// Structural checks that do not need a built engine.
pub fn validate_config(
    config: &RunConfig,
    registry: &UpdaterRegistry,
) -> Result<(), ValidationError> {
    if !config.time_step.is_finite() || config.time_step <= 0.0 {
        return Err(invalid(
            "time_step",
            config.time_step,
            "must be finite and positive",
        ));
    }
    if config.report_every == 0 {
        return Err(invalid("report_every", 0, "must be positive"));
    }

    if let Some(updater) = &config.environment.updater
        && !registry.contains(&updater.kind)
    {
        return Err(ValidationError::UnknownUpdater {
            kind: updater.kind.clone(),
        });
    }

    let observables = config.environment.observable_names.len();
    let mut sensor_names = HashSet::new();
    for (position, sensor) in config.sensors.iter().enumerate() {
        if !sensor_names.insert(sensor.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: sensor.name.clone(),
                context: "sensors".to_string(),
            });
        }
        let element = sensor.element.unwrap_or(position);
        let len = match sensor.channel {
            Channel::Input => config.sensors.len(),
            Channel::Observable => observables,
        };
        if element >= len {
            return Err(invalid(
                "sensor element",
                element,
                "outside the sensed vector",
            ));
        }
    }

    let mut names = HashSet::new();
    for component in &config.components {
        if !names.insert(component.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: component.name.clone(),
                context: "components".to_string(),
            });
        }
    }

    for component in &config.components {
        for target in &component.targets {
            if !names.contains(target.as_str()) {
                return Err(ValidationError::MissingReference {
                    name: target.clone(),
                    context: format!("targets of {}", component.name),
                });
            }
        }
        if let ComponentKind::LeakyIntegrator {
            input_channel,
            output_index,
            latency,
            ..
        } = &component.kind
        {
            if let Some(channel) = input_channel
                && *channel >= config.sensors.len()
            {
                return Err(invalid(
                    "input_channel",
                    channel,
                    "no sensor feeds this input",
                ));
            }
            if let Some(index) = output_index
                && *index >= observables
            {
                return Err(invalid(
                    "output_index",
                    index,
                    "outside environment.observable_names",
                ));
            }
            if *latency < 0.0 {
                return Err(invalid("latency", latency, "must be non-negative"));
            }
        }
    }

    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
time_step: 0.001
iterations: 200
report_every: 50
firing_errors: abort
environment:
  observable_names: [cell_spike]
  updater: { type: linear, slopes: [2.0], offsets: [0.5] }
sensors:
  - { name: drive }
  - { name: spikes, channel: observable, element: 0 }
components:
  - { name: clock, type: pulse_generator, period: 0.01, targets: [cell] }
  - name: cell
    type: leaky_integrator
    tau: 0.02
    threshold: 1
    weight: 0.4
    input_channel: 0
    output_index: 0
    latency: 0.002
"#;

    fn sample() -> RunConfig {
        serde_yaml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_sample() {
        let config = sample();
        assert_eq!(config.iterations, 200);
        assert_eq!(config.firing_errors, FiringErrorPolicy::Abort);
        assert_eq!(config.sensors[0].channel, Channel::Input);
        assert_eq!(config.sensors[1].channel, Channel::Observable);
        assert_eq!(config.environment.updater.as_ref().unwrap().kind, "linear");
        assert_eq!(
            config.components[0].kind,
            ComponentKind::PulseGenerator {
                period: 0.01,
                code: 1
            }
        );
        assert!(matches!(
            config.components[1].kind,
            ComponentKind::LeakyIntegrator {
                output_index: Some(0),
                ..
            }
        ));
        validate_config(&config, &UpdaterRegistry::default()).unwrap();
    }

    #[test]
    fn defaults_apply() {
        let config: RunConfig = serde_yaml::from_str("time_step: 0.1\niterations: 3\n").unwrap();
        assert_eq!(config.report_every, 100);
        assert_eq!(config.firing_errors, FiringErrorPolicy::Skip);
        assert!(config.components.is_empty());
        validate_config(&config, &UpdaterRegistry::default()).unwrap();
    }

    #[test]
    fn rejects_bad_time_step() {
        let mut config = sample();
        config.time_step = 0.0;
        assert!(matches!(
            validate_config(&config, &UpdaterRegistry::default()),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_missing_target() {
        let mut config = sample();
        config.components[0].targets = vec!["nobody".into()];
        assert!(matches!(
            validate_config(&config, &UpdaterRegistry::default()),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_component() {
        let mut config = sample();
        config.components[1].name = "clock".into();
        assert!(matches!(
            validate_config(&config, &UpdaterRegistry::default()),
            Err(ValidationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn rejects_output_outside_observables() {
        let mut config = sample();
        config.environment.observable_names.clear();
        config.sensors.truncate(1);
        let err = validate_config(&config, &UpdaterRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("output_index"));
    }

    #[test]
    fn rejects_sensor_past_observables() {
        let mut config = sample();
        config.sensors[1].element = None;
        let err = validate_config(&config, &UpdaterRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("sensor element"));
    }

    #[test]
    fn rejects_unknown_updater() {
        let mut config = sample();
        config.environment.updater = Some(UpdaterSpec::new("cubic"));
        assert!(matches!(
            validate_config(&config, &UpdaterRegistry::default()),
            Err(ValidationError::UnknownUpdater { .. })
        ));
    }

    #[test]
    fn shipped_configs_validate() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
        let entries = std::fs::read_dir(&dir).unwrap();
        let mut seen = 0;
        for entry in entries {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                load_config(&path).unwrap();
                seen += 1;
            }
        }
        assert!(seen > 0);
    }
}
