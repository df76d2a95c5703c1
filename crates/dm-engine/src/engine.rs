//! The step-loop driver.
//!
//! One iteration runs three phases in a fixed order:
//! 1. every component fires its due events (ascending id)
//! 2. the environment advances (updater, then sensors, then clock)
//! 3. every component elapses its local state (ascending id)
//!
//! Events and outputs a component produces are delivered as soon as its hook
//! returns, so a zero-delay event sent to a later id still fires in the same
//! iteration while one sent to an earlier id waits for the next.

use core::fmt;
use core::ops::{Deref, DerefMut};

use dm_core::{ComponentId, IdFactory, ensure_finite};
use dm_env::{Environment, OutputEvent, Updater};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::component::{Component, StepContext};
use crate::error::{ComponentError, ComponentResult, EngineError, EngineResult};
use crate::event::Event;
use crate::model::{Model, ModelEvent};

/// Redraws attempted before `add_component` gives up with [`EngineError::IdCollision`].
pub const MAX_ID_DRAWS: u32 = 16;

/// Component hook a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Events,
    Elapse,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Events => f.write_str("event firing"),
            Phase::Elapse => f.write_str("time elapse"),
        }
    }
}

/// What `execute_model` does when a component hook fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiringErrorPolicy {
    /// Log, record in the report, and skip the rest of that component's
    /// iteration. Other components proceed.
    #[default]
    Skip,
    /// Stop and return [`EngineError::ComponentFiring`].
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub firing_errors: FiringErrorPolicy,
}

/// A component failure tolerated under [`FiringErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq)]
pub struct FiringFailure {
    /// Engine iteration (zero-based, cumulative) the failure happened in.
    pub iteration: u64,
    pub id: ComponentId,
    pub name: String,
    pub phase: Phase,
    pub error: ComponentError,
}

/// Summary of one `execute_model` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Iterations completed by this call.
    pub iterations: u64,
    /// Engine clock after the call.
    pub clock: f64,
    pub failures: Vec<FiringFailure>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`Engine::add_component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted(ComponentId),
    /// A component with this id is already registered; the argument was dropped.
    AlreadyRegistered(ComponentId),
}

impl AddOutcome {
    pub fn id(self) -> ComponentId {
        match self {
            AddOutcome::Inserted(id) | AddOutcome::AlreadyRegistered(id) => id,
        }
    }
}

/// Owns the adopted model, its id source, and the iteration counters.
#[derive(Debug)]
pub struct Engine {
    model: Option<Model>,
    ids: IdFactory,
    clock: f64,
    iter: u64,
    time_step: f64,
    options: EngineOptions,
}

impl Engine {
    /// Engine stepping by `time_step`.
    ///
    /// Any finite value is accepted; a non-positive step gives a degenerate run.
    pub fn new(time_step: f64) -> EngineResult<Self> {
        let time_step = ensure_finite(time_step, "time step")?;
        Ok(Self {
            model: None,
            ids: IdFactory::new(),
            clock: 0.0,
            iter: 0,
            time_step,
            options: EngineOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder form of [`set_model`](Self::set_model).
    pub fn with_model(mut self, model: Model) -> Self {
        self.set_model(model);
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    /// Replace the id source. Ids already handed out are kept.
    pub fn set_id_factory(&mut self, ids: IdFactory) {
        self.ids = ids;
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Legal between runs; the accumulated clock is not rescaled.
    pub fn set_time_step(&mut self, time_step: f64) -> EngineResult<()> {
        self.time_step = ensure_finite(time_step, "time step")?;
        Ok(())
    }

    pub fn iterations(&self) -> u64 {
        self.iter
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Adopt `model`, returning the previously adopted one.
    ///
    /// Every component gets a fresh id and the registry is sorted. Listeners
    /// are told the structure changed, then the engine resets.
    pub fn set_model(&mut self, mut model: Model) -> Option<Model> {
        for component in &mut model.components {
            component.core_mut().set_id(self.ids.next_id());
        }
        model
            .components
            .sort_by_key(|c| c.core().id().map(ComponentId::get));
        model.fire_listeners(ModelEvent::StructureChanged);
        info!(
            model = model.name(),
            components = model.components.len(),
            sensors = model.environment.sensor_count(),
            "model adopted"
        );
        let previous = self.model.replace(model);
        self.reset();
        previous
    }

    /// Release the adopted model.
    pub fn take_model(&mut self) -> Option<Model> {
        self.model.take()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Mutable access to the adopted model.
    ///
    /// Components pushed through [`Model::add_component`] while the guard is
    /// alive are registered when it drops, as if passed to
    /// [`add_component`](Self::add_component).
    pub fn model_mut(&mut self) -> Option<AdoptedModel<'_>> {
        let model = self.model.as_mut()?;
        Some(AdoptedModel {
            tail: model.components.len(),
            model,
            ids: &mut self.ids,
        })
    }

    pub fn environment(&self) -> Option<&dyn Environment> {
        self.model.as_ref().map(Model::environment)
    }

    pub fn environment_mut(&mut self) -> Option<&mut dyn Environment> {
        let env: &mut dyn Environment = self.model.as_mut()?.environment.as_mut();
        Some(env)
    }

    pub fn set_updater(&mut self, updater: Box<dyn Updater>) -> EngineResult<()> {
        let model = self.model.as_mut().ok_or(EngineError::NoModel)?;
        model.environment.set_updater(updater)?;
        Ok(())
    }

    /// Zero the counters and reset the model.
    pub fn reset(&mut self) {
        self.iter = 0;
        self.clock = 0.0;
        if let Some(model) = self.model.as_mut() {
            model.reset();
        }
    }

    /// Run `iterations` full iterations.
    ///
    /// Counters advance per completed iteration, so an aborted run only counts
    /// what finished. An environment failure returns
    /// [`EngineError::EnvironmentStep`] with the report so far; the events that
    /// fired earlier in the failing iteration stay consumed.
    #[instrument(level = "debug", skip(self), fields(start = self.iter, dt = self.time_step))]
    pub fn execute_model(&mut self, iterations: u64) -> EngineResult<ExecutionReport> {
        let dt = self.time_step;
        let policy = self.options.firing_errors;
        let model = self.model.as_mut().ok_or(EngineError::NoModel)?;
        let mut failures = Vec::new();
        let mut completed = 0;

        for _ in 0..iterations {
            let clock = self.clock;
            let mut failed = vec![false; model.components.len()];

            for (index, skip) in failed.iter_mut().enumerate() {
                if let Err(error) = run_hook(model, index, Phase::Events, clock, dt) {
                    *skip = true;
                    let failure = failure_at(model, index, self.iter, Phase::Events, error);
                    tolerate(policy, failure, &mut failures)?;
                }
            }

            if let Err(source) = model.environment.time_elapsed(dt) {
                warn!(iteration = self.iter, error = %source, "environment step failed");
                return Err(EngineError::EnvironmentStep {
                    iteration: self.iter,
                    report: Box::new(ExecutionReport {
                        iterations: completed,
                        clock: self.clock,
                        failures,
                    }),
                    source,
                });
            }

            for (index, skip) in failed.iter().enumerate() {
                if *skip {
                    continue;
                }
                if let Err(error) = run_hook(model, index, Phase::Elapse, clock, dt) {
                    let failure = failure_at(model, index, self.iter, Phase::Elapse, error);
                    tolerate(policy, failure, &mut failures)?;
                }
            }

            self.iter += 1;
            self.clock += dt;
            completed += 1;
        }

        debug!(
            iterations,
            iter = self.iter,
            clock = self.clock,
            failures = failures.len(),
            "model executed"
        );
        Ok(ExecutionReport {
            iterations: completed,
            clock: self.clock,
            failures,
        })
    }

    /// Binary search of the registry: `Ok(index)` if `id` is registered,
    /// otherwise `Err(insertion_point)`.
    pub fn seek(&self, id: ComponentId) -> Result<usize, usize> {
        match self.model.as_ref() {
            Some(model) => seek_in(&model.components, id),
            None => Err(0),
        }
    }

    /// Register a component with the adopted model.
    ///
    /// A component whose id is already registered is left out. Otherwise a
    /// fresh id is drawn (redrawn on collision) and the component is inserted
    /// at its sorted position.
    pub fn add_component(&mut self, component: Box<dyn Component>) -> EngineResult<AddOutcome> {
        let model = self.model.as_mut().ok_or(EngineError::NoModel)?;
        register(model, &mut self.ids, component)
    }

    /// Remove a component. Remaining ids are not renumbered.
    pub fn remove_component(&mut self, id: ComponentId) -> EngineResult<Box<dyn Component>> {
        let model = self.model.as_mut().ok_or(EngineError::NoModel)?;
        let index =
            seek_in(&model.components, id).map_err(|_| EngineError::UnknownComponent { id })?;
        let removed = model.components.remove(index);
        debug!(%id, name = removed.name(), "component removed");
        model.fire_listeners(ModelEvent::ComponentRemoved(id));
        Ok(removed)
    }

    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        let model = self.model.as_ref()?;
        let index = seek_in(&model.components, id).ok()?;
        Some(model.components[index].as_ref())
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.model
            .as_ref()
            .map(|m| m.components.iter().filter_map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    pub fn component_count(&self) -> usize {
        self.model.as_ref().map_or(0, Model::component_count)
    }

    /// Add a directed edge `from -> to`. Returns false if it already existed.
    pub fn connect(&mut self, from: ComponentId, to: ComponentId) -> EngineResult<bool> {
        if self.seek(to).is_err() {
            return Err(EngineError::UnknownComponent { id: to });
        }
        Ok(self.component_mut(from)?.add_connection(to))
    }

    pub fn disconnect(&mut self, from: ComponentId, to: ComponentId) -> EngineResult<bool> {
        Ok(self.component_mut(from)?.remove_connection(to))
    }

    /// Queue an event on a component from outside the model.
    pub fn add_event(&mut self, id: ComponentId, event: Event) -> EngineResult<()> {
        self.component_mut(id)?.add_event(event);
        Ok(())
    }

    fn component_mut(&mut self, id: ComponentId) -> EngineResult<&mut Box<dyn Component>> {
        let model = self.model.as_mut().ok_or(EngineError::NoModel)?;
        let index =
            seek_in(&model.components, id).map_err(|_| EngineError::UnknownComponent { id })?;
        Ok(&mut model.components[index])
    }
}

/// Mutable view of an adopted model, handed out by [`Engine::model_mut`].
///
/// Components appended while the view is alive are unregistered; on drop they
/// are given ids and moved to their sorted slots.
pub struct AdoptedModel<'a> {
    model: &'a mut Model,
    ids: &'a mut IdFactory,
    tail: usize,
}

impl Deref for AdoptedModel<'_> {
    type Target = Model;

    fn deref(&self) -> &Model {
        &*self.model
    }
}

impl DerefMut for AdoptedModel<'_> {
    fn deref_mut(&mut self) -> &mut Model {
        &mut *self.model
    }
}

impl Drop for AdoptedModel<'_> {
    fn drop(&mut self) {
        let tail = self.tail.min(self.model.components.len());
        let appended = self.model.components.split_off(tail);
        for component in appended {
            let name = component.name().to_owned();
            if let Err(error) = register(&mut *self.model, &mut *self.ids, component) {
                warn!(%name, %error, "component added through model_mut dropped");
            }
        }
    }
}

impl fmt::Debug for AdoptedModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdoptedModel")
            .field("model", &self.model.name())
            .field("pending", &self.model.components.len().saturating_sub(self.tail))
            .finish()
    }
}

/// Give `component` an id and insert it at its sorted position.
fn register(
    model: &mut Model,
    ids: &mut IdFactory,
    mut component: Box<dyn Component>,
) -> EngineResult<AddOutcome> {
    if let Some(id) = component.id()
        && seek_in(&model.components, id).is_ok()
    {
        debug!(%id, "component already registered");
        return Ok(AddOutcome::AlreadyRegistered(id));
    }

    let mut attempts = 0;
    let (id, slot) = loop {
        attempts += 1;
        let id = ids.next_id();
        match seek_in(&model.components, id) {
            Err(slot) => break (id, slot),
            Ok(_) if attempts >= MAX_ID_DRAWS => {
                return Err(EngineError::IdCollision { id, attempts });
            }
            Ok(_) => warn!(%id, attempts, "id collision, redrawing"),
        }
    };

    component.core_mut().set_id(id);
    debug!(%id, name = component.name(), "component added");
    model.components.insert(slot, component);
    model.fire_listeners(ModelEvent::ComponentAdded(id));
    Ok(AddOutcome::Inserted(id))
}

fn seek_in(components: &[Box<dyn Component>], id: ComponentId) -> Result<usize, usize> {
    components.binary_search_by(|c| c.id().cmp(&Some(id)))
}

/// Run one hook on `components[index]` and deliver what it produced.
fn run_hook(
    model: &mut Model,
    index: usize,
    phase: Phase,
    clock: f64,
    dt: f64,
) -> ComponentResult<()> {
    let Model {
        components,
        environment,
        ..
    } = model;
    let component = &mut components[index];
    let mut ctx = StepContext::new(&**environment, component.id(), clock, dt);
    let outcome = match phase {
        Phase::Events => component.execute_events(dt, &mut ctx),
        Phase::Elapse => component.time_elapsed(dt, &mut ctx),
    };
    let (events, outputs) = ctx.into_outbox();
    let delivered = deliver(components, &mut **environment, events, outputs);
    outcome.and(delivered)
}

fn deliver(
    components: &mut [Box<dyn Component>],
    environment: &mut dyn Environment,
    events: Vec<(ComponentId, Event)>,
    outputs: Vec<OutputEvent>,
) -> ComponentResult<()> {
    for (target, event) in events {
        match seek_in(components, target) {
            Ok(i) => components[i].add_event(event),
            Err(_) => warn!(%target, code = event.code, "event for unknown component dropped"),
        }
    }
    for output in outputs {
        environment.handle_output_event(output)?;
    }
    Ok(())
}

fn failure_at(
    model: &Model,
    index: usize,
    iteration: u64,
    phase: Phase,
    error: ComponentError,
) -> FiringFailure {
    let component = &model.components[index];
    FiringFailure {
        iteration,
        // adopted components always carry an id
        id: component.id().unwrap_or(ComponentId::MIN),
        name: component.name().to_owned(),
        phase,
        error,
    }
}

fn tolerate(
    policy: FiringErrorPolicy,
    failure: FiringFailure,
    failures: &mut Vec<FiringFailure>,
) -> EngineResult<()> {
    match policy {
        FiringErrorPolicy::Abort => Err(EngineError::ComponentFiring {
            id: failure.id,
            name: failure.name,
            phase: failure.phase,
            source: failure.error,
        }),
        FiringErrorPolicy::Skip => {
            warn!(
                id = %failure.id,
                name = %failure.name,
                phase = %failure.phase,
                error = %failure.error,
                "component failure skipped"
            );
            failures.push(failure);
            Ok(())
        }
    }
}
