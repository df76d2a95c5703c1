use dm_engine::{ComponentError, EngineError};
use dm_env::EnvError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Environment error: {0}")]
    Environment(#[from] EnvError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),
}

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown updater type: {kind}")]
    UnknownUpdater { kind: String },
}
