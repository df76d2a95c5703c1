//! dm-engine: discrete-time driver for dynamic models.
//!
//! A [`Model`] is a set of [`Component`]s plus one environment. An [`Engine`]
//! adopts a model, gives every component a unique id, and steps it:
//! events fire, the environment advances, then components elapse.

pub mod builtin;
pub mod component;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;

pub use component::{Component, ComponentCore, StepContext};
pub use engine::{
    AddOutcome, AdoptedModel, Engine, EngineOptions, ExecutionReport, FiringErrorPolicy,
    FiringFailure, MAX_ID_DRAWS, Phase,
};
pub use error::{ComponentError, ComponentResult, EngineError, EngineResult};
pub use event::{Event, EventQueue};
pub use model::{Model, ModelEvent, ModelListener};
