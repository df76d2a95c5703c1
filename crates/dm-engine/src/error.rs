//! Error types for components and the engine.

use dm_core::{ComponentId, CoreError};
use dm_env::EnvError;
use thiserror::Error;

use crate::engine::{ExecutionReport, Phase};

/// Errors raised by a component while firing events or elapsing time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Event code {code} not handled: {what}")]
    Firing { code: i32, what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ComponentResult<T> = Result<T, ComponentError>;

/// Errors surfaced by [`Engine`](crate::Engine) operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No model has been set on the engine")]
    NoModel,

    #[error("Component {id} ({name}) failed during {phase}: {source}")]
    ComponentFiring {
        id: ComponentId,
        name: String,
        phase: Phase,
        #[source]
        source: ComponentError,
    },

    #[error("Id collision: {id} still registered after {attempts} draws")]
    IdCollision { id: ComponentId, attempts: u32 },

    #[error("Unknown component: {id}")]
    UnknownComponent { id: ComponentId },

    /// The environment failed while stepping. `report` covers the
    /// iterations that completed before the failing one.
    #[error("Environment failed in iteration {iteration}: {source}")]
    EnvironmentStep {
        iteration: u64,
        report: Box<ExecutionReport>,
        #[source]
        source: EnvError,
    },

    #[error("Environment error: {0}")]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True when the error is an environment rejecting an updater.
    pub fn is_incompatible_updater(&self) -> bool {
        matches!(
            self,
            EngineError::Environment(EnvError::IncompatibleUpdater { .. })
        )
    }

    /// Partial results carried by a run that stopped on an environment failure.
    pub fn partial_report(&self) -> Option<&ExecutionReport> {
        match self {
            EngineError::EnvironmentStep { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::Firing {
            code: 9,
            what: "unsupported event code",
        };
        assert!(err.to_string().contains('9'));
        assert!(EngineError::NoModel.to_string().contains("No model"));
    }

    #[test]
    fn firing_error_keeps_source() {
        use std::error::Error as _;

        let id = ComponentId::new(3).unwrap();
        let err = EngineError::ComponentFiring {
            id,
            name: "cell".into(),
            phase: Phase::Events,
            source: ComponentError::InvalidArg { what: "weight" },
        };
        assert!(err.to_string().contains("#3"));
        assert!(err.source().is_some());
    }

    #[test]
    fn env_errors_convert() {
        let err: EngineError = EnvError::IncompatibleUpdater {
            updater: "x".into(),
            environment: "simple",
        }
        .into();
        assert!(err.is_incompatible_updater());
    }
}
