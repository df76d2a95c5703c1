//! Component contract: event queue, connections, and time hooks.

use core::any::Any;
use core::fmt;

use dm_core::ComponentId;
use dm_env::{Environment, OutputEvent};

use crate::error::ComponentResult;
use crate::event::{Event, EventQueue};

/// State every component carries: identity, pending events and outgoing edges.
#[derive(Debug, Clone, Default)]
pub struct ComponentCore {
    id: Option<ComponentId>,
    name: String,
    queue: EventQueue,
    connections: Vec<ComponentId>,
}

impl ComponentCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Assigned by the engine on adoption; `None` before that.
    pub fn id(&self) -> Option<ComponentId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ComponentId) {
        self.id = Some(id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    pub fn connections(&self) -> &[ComponentId] {
        &self.connections
    }

    /// Add an outgoing edge; duplicates are ignored.
    pub fn add_connection(&mut self, target: ComponentId) -> bool {
        if self.connections.contains(&target) {
            return false;
        }
        self.connections.push(target);
        true
    }

    pub fn remove_connection(&mut self, target: ComponentId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| *c != target);
        self.connections.len() != before
    }
}

/// Per-hook view handed to a component by the engine.
///
/// Gives read access to the environment and collects what the component
/// produces. The engine delivers the collected events and outputs as soon as
/// the hook returns.
pub struct StepContext<'a> {
    environment: &'a dyn Environment,
    source: Option<ComponentId>,
    clock: f64,
    dt: f64,
    events: Vec<(ComponentId, Event)>,
    outputs: Vec<OutputEvent>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        environment: &'a dyn Environment,
        source: Option<ComponentId>,
        clock: f64,
        dt: f64,
    ) -> Self {
        Self {
            environment,
            source,
            clock,
            dt,
            events: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn environment(&self) -> &'a dyn Environment {
        self.environment
    }

    /// Component whose hook is running.
    pub fn source(&self) -> Option<ComponentId> {
        self.source
    }

    /// Engine clock at the start of the current iteration.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Queue `event` for `target`.
    pub fn emit(&mut self, target: ComponentId, event: Event) {
        self.events.push((target, event));
    }

    /// Queue a copy of `event` for each target.
    pub fn broadcast(&mut self, targets: &[ComponentId], event: Event) {
        self.events.extend(targets.iter().map(|t| (*t, event)));
    }

    /// Set `observable[index] = value` on the environment.
    pub fn output(&mut self, event: OutputEvent) {
        self.outputs.push(event);
    }

    pub fn pending_events(&self) -> &[(ComponentId, Event)] {
        &self.events
    }

    pub fn pending_outputs(&self) -> &[OutputEvent] {
        &self.outputs
    }

    pub(crate) fn into_outbox(self) -> (Vec<(ComponentId, Event)>, Vec<OutputEvent>) {
        (self.events, self.outputs)
    }
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("source", &self.source)
            .field("clock", &self.clock)
            .field("dt", &self.dt)
            .field("events", &self.events)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A node of the model graph.
///
/// Implementors provide [`ComponentCore`] access plus the two time hooks; the
/// queue, connection and identity operations are provided. Two components are
/// the same registry entry iff their ids are equal.
pub trait Component: fmt::Debug {
    fn core(&self) -> &ComponentCore;

    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Handle one due event, dispatching on its code.
    fn fire(&mut self, event: Event, ctx: &mut StepContext<'_>) -> ComponentResult<()>;

    /// Advance component-local continuous state by `dt`.
    ///
    /// Runs once per iteration, after every component's events fired and the
    /// environment advanced.
    fn time_elapsed(&mut self, dt: f64, ctx: &mut StepContext<'_>) -> ComponentResult<()>;

    /// Clear component-local state. The event queue is cleared by [`reset`](Self::reset).
    fn reset_state(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> Option<ComponentId> {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Append to the tail of this component's queue.
    fn add_event(&mut self, event: Event) {
        self.core_mut().queue_mut().push(event);
    }

    fn add_connection(&mut self, target: ComponentId) -> bool {
        self.core_mut().add_connection(target)
    }

    fn remove_connection(&mut self, target: ComponentId) -> bool {
        self.core_mut().remove_connection(target)
    }

    fn connections(&self) -> &[ComponentId] {
        self.core().connections()
    }

    /// Age queued events by `dt` and fire the ones that fell due, in queue order.
    ///
    /// Every due event is fired even if an earlier one fails; the first
    /// failure is returned.
    fn execute_events(&mut self, dt: f64, ctx: &mut StepContext<'_>) -> ComponentResult<()> {
        let due = self.core_mut().queue_mut().elapse(dt);
        let mut first_err = None;
        for event in due {
            if let Err(err) = self.fire(event, ctx) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Drop pending events and clear local state.
    fn reset(&mut self) {
        self.core_mut().queue_mut().clear();
        self.reset_state();
    }
}

impl dyn Component + '_ {
    pub fn downcast_ref<C: Component + 'static>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }
}
