//! Turns a validated [`RunConfig`] into an engine with an adopted model.

use std::collections::BTreeMap;

use dm_core::ComponentId;
use dm_engine::builtin::{LeakyIntegrator, PulseGenerator};
use dm_engine::{Component, Engine, EngineOptions, Model};
use dm_env::{Environment, RecordingSensor, SimpleEnvironment, UpdaterRegistry};
use tracing::debug;

use crate::config::{ComponentDef, ComponentKind, RunConfig};
use crate::error::{CliError, CliResult, ValidationError};

/// Engine plus the id each configured component received.
#[derive(Debug)]
pub struct Built {
    pub engine: Engine,
    pub ids: BTreeMap<String, ComponentId>,
}

pub fn build_engine(config: &RunConfig, registry: &UpdaterRegistry) -> CliResult<Built> {
    let names = &config.environment.observable_names;
    let mut env = SimpleEnvironment::new().with_observable_size(names.len());
    if !names.is_empty() {
        env.state_mut().set_observable_names(names.iter().cloned());
    }
    if let Some(spec) = &config.environment.updater {
        env.set_updater(registry.build(spec)?)?;
    }

    let mut model = Model::new("run", Box::new(env));
    for sensor in &config.sensors {
        let mut recorder = RecordingSensor::on_channel(sensor.name.as_str(), sensor.channel);
        if let Some(element) = sensor.element {
            recorder = recorder.with_element(element);
        }
        model.add_sensor(Box::new(recorder));
    }
    if !config.sensors.is_empty() {
        model
            .environment_mut()
            .state_mut()
            .set_input_names(config.sensors.iter().map(|s| s.name.clone()));
    }
    for def in &config.components {
        model.add_component(component(def)?);
    }

    let engine = Engine::new(config.time_step)?
        .with_options(EngineOptions {
            firing_errors: config.firing_errors,
        })
        .with_model(model);

    let ids: BTreeMap<String, ComponentId> = engine
        .model()
        .into_iter()
        .flat_map(|m| m.components())
        .filter_map(|c| Some((c.name().to_string(), c.id()?)))
        .collect();

    let mut built = Built { engine, ids };
    for def in &config.components {
        let from = lookup(&built.ids, &def.name)?;
        for target in &def.targets {
            let to = lookup(&built.ids, target)?;
            built.engine.connect(from, to)?;
        }
    }
    debug!(components = built.ids.len(), "engine built");
    Ok(built)
}

fn component(def: &ComponentDef) -> CliResult<Box<dyn Component>> {
    let built: Box<dyn Component> = match def.kind {
        ComponentKind::PulseGenerator { period, code } => {
            Box::new(PulseGenerator::new(def.name.as_str(), period, code)?)
        }
        ComponentKind::LeakyIntegrator {
            tau,
            threshold,
            weight,
            input_channel,
            output_index,
            latency,
        } => {
            let mut cell = LeakyIntegrator::new(def.name.as_str(), tau, threshold, weight)?
                .with_latency(latency)?;
            if let Some(channel) = input_channel {
                cell = cell.with_input_channel(channel);
            }
            if let Some(index) = output_index {
                cell = cell.with_output_index(index);
            }
            Box::new(cell)
        }
    };
    Ok(built)
}

fn lookup(ids: &BTreeMap<String, ComponentId>, name: &str) -> CliResult<ComponentId> {
    ids.get(name).copied().ok_or_else(|| {
        CliError::Validation(ValidationError::MissingReference {
            name: name.to_string(),
            context: "components".to_string(),
        })
    })
}
