//! Steam property errors.

use bf_core::EngineError;
use thiserror::Error;

/// Result type for steam property lookups.
pub type SteamResult<T> = Result<T, SteamError>;

/// Errors that can occur during steam property lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SteamError {
    /// The property key is not recognized by this backend.
    #[error("Unknown property key: {key}")]
    UnknownKey { key: String },

    /// Wrong number of arguments for the property key.
    #[error("Property {key} expects {expected} argument(s), got {got}")]
    Arity {
        key: &'static str,
        expected: usize,
        got: usize,
    },

    /// Input outside the backend's valid region.
    #[error("Value out of range for {what}: {value}")]
    OutOfRange { what: &'static str, value: f64 },

    /// Non-physical input (negative pressure, NaN, …).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },
}

impl From<SteamError> for EngineError {
    fn from(err: SteamError) -> Self {
        EngineError::calculation(format!("steam table: {err}"))
    }
}
