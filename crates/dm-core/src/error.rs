use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Rejected scalar parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} must be positive, got {value}")]
    NotPositive { what: &'static str, value: f64 },

    #[error("Missing parameter: {what}")]
    MissingParam { what: &'static str },
}
