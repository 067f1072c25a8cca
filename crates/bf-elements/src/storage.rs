//! Storage core for capacitive and inductive elements.

use bf_core::{EngineError, EngineResult, Real, ensure_finite};

/// State pair with explicit-Euler integration and prepare-time commit.
///
/// `step` only ever writes `next_state_value`; the swap into `state_value`
/// happens inside the next `prepare`, so a failed step never corrupts the
/// committed state.
#[derive(Debug, Clone)]
pub struct Storage {
    state_value: Real,
    next_state_value: Real,
    state_prepared: bool,
    /// Time constant scaling the integrated quantity.
    pub tau: Real,
    step_time: Real,
    /// Added to the state when imposing it as an effort.
    pub effort_offset: Real,
    /// Physically-impossible negative state (e.g. tank mass) is a model
    /// error instead of a silent clamp.
    pub forbid_negative: bool,
    integrated: bool,
}

impl Storage {
    pub fn new(tau: Real) -> Self {
        Self {
            state_value: 0.0,
            next_state_value: 0.0,
            state_prepared: false,
            tau,
            step_time: 0.0,
            effort_offset: 0.0,
            forbid_negative: false,
            integrated: false,
        }
    }

    pub fn state_value(&self) -> Real {
        self.state_value
    }

    pub fn set_state_value(&mut self, value: Real) {
        self.state_value = value;
        self.next_state_value = value;
        self.state_prepared = false;
    }

    pub fn set_step_time(&mut self, dt: Real) {
        self.step_time = dt;
    }

    pub fn step_time(&self) -> Real {
        self.step_time
    }

    pub fn is_integrated(&self) -> bool {
        self.integrated
    }

    /// Commit the prepared next-state and reset the per-cycle mark.
    pub fn prepare(&mut self) {
        if self.state_prepared {
            self.state_value = self.next_state_value;
            self.state_prepared = false;
        }
        self.integrated = false;
    }

    /// Accumulate one explicit-Euler step: `Δ = dt · rate · τ`.
    pub fn integrate(&mut self, name: &str, rate: Real) -> EngineResult<()> {
        let next = self.state_value + self.step_time * rate * self.tau;
        ensure_finite(next, "storage next state")?;
        if self.forbid_negative && next < 0.0 {
            return Err(EngineError::model(format!(
                "'{name}': state would become negative ({next})"
            )));
        }
        self.next_state_value = next;
        self.state_prepared = true;
        self.integrated = true;
        Ok(())
    }
}
