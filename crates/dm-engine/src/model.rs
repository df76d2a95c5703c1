//! Model aggregate: one environment plus a set of components.

use core::fmt;

use dm_core::{ComponentId, ListenerId, ListenerSet};
use dm_env::{Environment, Sensor, SimpleEnvironment};
use tracing::debug;

use crate::component::Component;

/// Structural notification delivered to model listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    /// The model was adopted or rebuilt as a whole.
    StructureChanged,
    ComponentAdded(ComponentId),
    ComponentRemoved(ComponentId),
}

pub trait ModelListener {
    fn model_changed(&mut self, event: ModelEvent);
}

impl<F: FnMut(ModelEvent)> ModelListener for F {
    fn model_changed(&mut self, event: ModelEvent) {
        self(event)
    }
}

/// Components and their environment.
///
/// Component order carries no meaning until an engine adopts the model; from
/// then on the engine keeps `components` sorted by id.
pub struct Model {
    name: String,
    pub(crate) components: Vec<Box<dyn Component>>,
    pub(crate) environment: Box<dyn Environment>,
    listeners: ListenerSet<dyn ModelListener>,
}

impl Model {
    pub fn new(name: impl Into<String>, environment: Box<dyn Environment>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            environment,
            listeners: ListenerSet::new(),
        }
    }

    /// Model over a default [`SimpleEnvironment`].
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, Box::new(SimpleEnvironment::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a component. Ids are handed out by the engine: at adoption, or
    /// when the [`AdoptedModel`](crate::AdoptedModel) view this was called
    /// through drops.
    pub fn add_component(&mut self, component: Box<dyn Component>) {
        self.components.push(component);
        self.fire_listeners(ModelEvent::StructureChanged);
    }

    /// Builder form of [`add_component`](Self::add_component).
    pub fn with_component(mut self, component: Box<dyn Component>) -> Self {
        self.add_component(component);
        self
    }

    pub fn components(&self) -> impl ExactSizeIterator<Item = &dyn Component> {
        self.components.iter().map(|c| c.as_ref() as &dyn Component)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Look up a component by name (first match).
    pub fn find(&self, name: &str) -> Option<&dyn Component> {
        self.components().find(|c| c.name() == name)
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    pub fn environment_mut(&mut self) -> &mut dyn Environment {
        self.environment.as_mut()
    }

    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) -> usize {
        self.environment.add_sensor(sensor)
    }

    pub fn remove_sensor(&mut self, index: usize) -> Option<Box<dyn Sensor>> {
        self.environment.remove_sensor(index)
    }

    /// Swap in a new environment, carrying the attached sensors across.
    ///
    /// The old environment's updater and state stay with it; it is returned
    /// without sensors.
    pub fn set_environment(&mut self, environment: Box<dyn Environment>) -> Box<dyn Environment> {
        let mut old = core::mem::replace(&mut self.environment, environment);
        while let Some(sensor) = old.remove_sensor(0) {
            self.environment.add_sensor(sensor);
        }
        debug!(
            model = %self.name,
            sensors = self.environment.sensor_count(),
            "environment replaced"
        );
        self.fire_listeners(ModelEvent::StructureChanged);
        old
    }

    /// Reset the environment and every component.
    pub fn reset(&mut self) {
        self.environment.reset();
        for component in &mut self.components {
            component.reset();
        }
    }

    pub fn add_listener(&mut self, listener: impl ModelListener + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    /// Detach one listener. Returns false if `id` is not attached.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn fire_listeners(&mut self, event: ModelEvent) {
        for listener in self.listeners.iter_mut() {
            listener.model_changed(event);
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("components", &self.components)
            .field("environment", &self.environment)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
