//! Controller blocks.
//!
//! - **P (proportional)**: stateless gain with output clamping
//! - **PID**: proportional-integral-derivative with anti-windup, integral
//!   clamping, and a filtered derivative

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Proportional controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PController {
    /// Proportional gain.
    pub kp: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl PController {
    pub fn new(kp: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            out_min,
            out_max,
        })
    }

    /// Compute the clamped output for a process variable and setpoint.
    pub fn update(&self, pv: f64, sp: f64) -> f64 {
        (self.kp * (sp - pv)).clamp(self.out_min, self.out_max)
    }
}

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time constant (seconds). Larger values reduce integral action.
    pub ti: f64,
    /// Derivative time constant (seconds).
    pub td: f64,
    /// Derivative filter time constant (seconds); tames noise amplification.
    pub td_filter: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Integral windup limit. If None, the output limits bound it.
    pub integral_limit: Option<f64>,
}

/// PID controller state carried between samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PIDControllerState {
    /// Integral accumulator.
    pub integral: f64,
    /// Filtered derivative of the error.
    pub derivative_filtered: f64,
    /// Error at the previous sample.
    pub previous_error: f64,
}

impl PIDController {
    pub fn new(
        kp: f64,
        ti: f64,
        td: f64,
        td_filter: f64,
        out_min: f64,
        out_max: f64,
    ) -> ControlResult<Self> {
        if ti <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if td < 0.0 || td_filter < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "td and td_filter must be non-negative",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ti,
            td,
            td_filter,
            out_min,
            out_max,
            integral_limit: None,
        })
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// One sampled update; returns the new state and the clamped output.
    pub fn update(
        &self,
        state: &PIDControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
    ) -> (PIDControllerState, f64) {
        let error = sp - pv;

        let p_term = self.kp * error;

        // Integral with anti-windup.
        let ki = self.kp / self.ti;
        let new_integral = state.integral + error * dt;
        let clamped_integral = if let Some(limit) = self.integral_limit {
            new_integral.clamp(-limit, limit)
        } else {
            new_integral
        };
        let i_term = ki * clamped_integral;

        // Filtered derivative.
        let raw_derivative = if dt > 0.0 {
            (error - state.previous_error) / dt
        } else {
            0.0
        };
        let alpha = if self.td_filter > 0.0 {
            dt / (self.td_filter + dt)
        } else {
            1.0
        };
        let derivative_filtered =
            state.derivative_filtered + alpha * (raw_derivative - state.derivative_filtered);
        let d_term = self.kp * self.td * derivative_filtered;

        let output_raw = p_term + i_term + d_term;
        let output = output_raw.clamp(self.out_min, self.out_max);

        // Saturated output stops integral accumulation.
        let final_integral = if output == output_raw {
            clamped_integral
        } else {
            state.integral
        };

        (
            PIDControllerState {
                integral: final_integral,
                derivative_filtered,
                previous_error: error,
            },
            output,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p_controller_clamps() {
        let p = PController::new(2.0, -1.0, 1.0).unwrap();
        assert_eq!(p.update(0.0, 0.25), 0.5);
        assert_eq!(p.update(0.0, 10.0), 1.0);
        assert_eq!(p.update(10.0, 0.0), -1.0);
    }

    #[test]
    fn p_controller_rejects_bad_limits() {
        assert!(PController::new(1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn pid_converges_on_constant_error_free_plant() {
        // Trivial closed loop: plant output follows controller output.
        let pid = PIDController::new(0.5, 2.0, 0.0, 0.0, -10.0, 10.0).unwrap();
        let mut state = PIDControllerState::default();
        let mut pv = 0.0;
        for _ in 0..500 {
            let (next, out) = pid.update(&state, pv, 1.0, 0.05);
            state = next;
            pv += 0.1 * (out - pv);
        }
        assert!((pv - 1.0).abs() < 1e-2);
    }

    #[test]
    fn pid_anti_windup_freezes_integral_at_saturation() {
        let pid = PIDController::new(1.0, 1.0, 0.0, 0.0, -1.0, 1.0).unwrap();
        let mut state = PIDControllerState::default();
        // Large persistent error saturates the output immediately.
        for _ in 0..100 {
            let (next, out) = pid.update(&state, 0.0, 100.0, 0.1);
            assert_eq!(out, 1.0);
            state = next;
        }
        // Integral did not run away while saturated.
        assert_eq!(state.integral, 0.0);
    }

    #[test]
    fn pid_integral_limit_applies() {
        let pid = PIDController::new(0.1, 10.0, 0.0, 0.0, -100.0, 100.0)
            .unwrap()
            .with_integral_limit(0.5);
        let mut state = PIDControllerState::default();
        for _ in 0..1000 {
            let (next, _) = pid.update(&state, 0.0, 1.0, 0.1);
            state = next;
        }
        assert!(state.integral <= 0.5);
    }
}
