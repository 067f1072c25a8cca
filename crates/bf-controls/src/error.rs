//! Control toolkit errors.

use thiserror::Error;

/// Errors from control blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },
}

pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ControlError::UnknownParameter {
            name: "kp".into(),
        };
        assert!(err.to_string().contains("kp"));
    }
}
