use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// The three error kinds observable at the engine boundary.
///
/// - `Model`: structural or physical impossibility at build time or during a
///   step (negative tank mass, inconsistent converter flow directions, too
///   many registered nodes, wrong-typed node on a handler, asymmetric
///   coupling). Fatal, no recovery.
/// - `Calculation`: a derivation produced a non-finite value, two derivation
///   paths disagreed, the sweep cap was exceeded, or a slot was read before
///   it was updated / while it carried no value. Fatal for the current step;
///   the last committed state remains valid.
/// - `MissingStateVariable`: a handler without intrinsic capacity was asked
///   for its own temperature, mass, or volume.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model error: {what}")]
    Model { what: String },

    #[error("Calculation error: {what}")]
    Calculation { what: String },

    #[error("Nonexisting state variable: {what}")]
    MissingStateVariable { what: String },
}

impl EngineError {
    pub fn model(what: impl Into<String>) -> Self {
        EngineError::Model { what: what.into() }
    }

    pub fn calculation(what: impl Into<String>) -> Self {
        EngineError::Calculation { what: what.into() }
    }

    pub fn missing_state(what: impl Into<String>) -> Self {
        EngineError::MissingStateVariable { what: what.into() }
    }

    /// True for the kinds that invalidate the current step but not the model.
    pub fn is_step_local(&self) -> bool {
        matches!(self, EngineError::Calculation { .. })
    }
}
