//! Error types for environment operations.

use dm_core::CoreError;
use thiserror::Error;

/// Errors raised by environments, updaters and sensors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvError {
    #[error("Updater '{updater}' cannot drive a {environment} environment")]
    IncompatibleUpdater {
        updater: String,
        environment: &'static str,
    },

    #[error("Unknown updater type: {name}")]
    UnknownUpdater { name: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Updater '{name}' failed: {message}")]
    Updater { name: String, message: String },

    #[error("Sensor '{name}' failed: {message}")]
    Sensor { name: String, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type EnvResult<T> = Result<T, EnvError>;
