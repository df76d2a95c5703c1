//! Name-keyed construction of updaters.

use core::fmt;
use std::collections::BTreeMap;

use dm_core::CoreError;
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, EnvResult};
use crate::updater::{LinearUpdater, NullUpdater, RelaxationUpdater, Updater};

/// Declarative updater description, e.g. from a run configuration.
///
/// `type` selects the factory; the remaining fields are a parameter bag each
/// factory reads from as needed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdaterSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slopes: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offsets: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau: Option<f64>,
}

impl UpdaterSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// Builds an updater from its description.
pub type UpdaterFactory = fn(&UpdaterSpec) -> EnvResult<Box<dyn Updater>>;

/// Registered updater factories.
#[derive(Clone)]
pub struct UpdaterRegistry {
    factories: BTreeMap<String, UpdaterFactory>,
}

impl fmt::Debug for UpdaterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Default for UpdaterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("none", build_null);
        registry.register("linear", build_linear);
        registry.register("relaxation", build_relaxation);
        registry
    }
}

fn build_null(_spec: &UpdaterSpec) -> EnvResult<Box<dyn Updater>> {
    Ok(Box::new(NullUpdater))
}

fn build_linear(spec: &UpdaterSpec) -> EnvResult<Box<dyn Updater>> {
    Ok(Box::new(LinearUpdater::new(
        spec.slopes.clone(),
        spec.offsets.clone(),
    )))
}

fn build_relaxation(spec: &UpdaterSpec) -> EnvResult<Box<dyn Updater>> {
    let tau = spec.tau.ok_or(CoreError::MissingParam {
        what: "relaxation updater requires tau",
    })?;
    Ok(Box::new(RelaxationUpdater::new(tau)?))
}

impl UpdaterRegistry {
    /// Registry with the built-in updaters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: UpdaterFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, spec: &UpdaterSpec) -> EnvResult<Box<dyn Updater>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| EnvError::UnknownUpdater {
                name: spec.kind.clone(),
            })?;
        factory(spec)
    }
}
