//! Rate-limited setpoint ramping.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Integrates a commanded setpoint toward its target at a bounded rate.
///
/// Operators command step changes; the plant sees a ramp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointIntegrator {
    /// Maximum slew rate, units per second.
    pub rate: f64,
    current: f64,
    target: f64,
}

impl SetpointIntegrator {
    pub fn new(initial: f64, rate: f64) -> ControlResult<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "slew rate must be positive",
            });
        }
        Ok(Self {
            rate,
            current: initial,
            target: initial,
        })
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Advance the ramp by `dt` seconds; returns the effective setpoint.
    pub fn update(&mut self, dt: f64) -> f64 {
        let max_step = self.rate * dt.max(0.0);
        let delta = self.target - self.current;
        self.current += delta.clamp(-max_step, max_step);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_at_the_configured_rate() {
        let mut sp = SetpointIntegrator::new(0.0, 2.0).unwrap();
        sp.set_target(10.0);
        assert_eq!(sp.update(1.0), 2.0);
        assert_eq!(sp.update(1.0), 4.0);
        // Never overshoots the target.
        for _ in 0..10 {
            sp.update(1.0);
        }
        assert_eq!(sp.current(), 10.0);
    }

    #[test]
    fn ramps_down_too() {
        let mut sp = SetpointIntegrator::new(5.0, 1.0).unwrap();
        sp.set_target(3.0);
        assert_eq!(sp.update(1.0), 4.0);
        assert_eq!(sp.update(5.0), 3.0);
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(SetpointIntegrator::new(0.0, 0.0).is_err());
    }
}
