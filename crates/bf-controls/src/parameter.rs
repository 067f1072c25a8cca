//! Named scalar parameters.

use std::collections::HashMap;

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Flat store of named scalar parameters (gains, limits, calibration
/// constants) shared between control blocks and a harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterHandler {
    values: HashMap<String, f64>,
}

impl ParameterHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> ControlResult<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ControlError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.values.get(name).copied().unwrap_or(default)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
