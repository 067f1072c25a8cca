//! Dissipator laws: the effort/flow relations of resistive elements.

use bf_core::{EngineError, EngineResult, Real, ensure_finite};

/// ΔT₁ and ΔT₂ closer than this use the limit value of the log-mean.
const LOG_MEAN_GUARD: Real = 1e-9;

/// The effort/flow law of a dissipator element.
#[derive(Debug, Clone)]
pub enum Dissipator {
    /// `q = (e0 − e1) / R`; invertible, so missing efforts can be derived
    /// from a known flow.
    Linear { resistance: Real },

    /// Counterflow heat-exchanger resistor on the log-mean temperature
    /// difference: `q = k·A · ΔT_lm`.
    ///
    /// The log-mean diverges as ΔT₁ → ΔT₂ and the law is only trustworthy
    /// near the operating point it was calibrated at; not for dynamic
    /// simulation. Prefer [`Dissipator::InflowAdjusted`] there.
    LogGradient {
        k_a: Real,
        /// Externally supplied inlet temperatures (hot side, cold side);
        /// terminal efforts are used when absent.
        inlet_temps: Option<(Real, Real)>,
    },

    /// Inlet-adjusted correction:
    /// `q = k·A · (ΔT_D + ΔT_F · counterFactor · 0.5)` with
    /// `counterFactor = 1 − |(ṁ₀+ṁ₁)/(|ṁ₀|+|ṁ₁|)|`.
    InflowAdjusted {
        k_a: Real,
        inlet_temps: Option<(Real, Real)>,
        /// Mass flows of the two attached circuits.
        inflows: Option<(Real, Real)>,
    },
}

impl Dissipator {
    pub fn linear(resistance: Real) -> EngineResult<Self> {
        if !(resistance.is_finite() && resistance > 0.0) {
            return Err(EngineError::model("dissipator resistance must be positive"));
        }
        Ok(Dissipator::Linear { resistance })
    }

    /// Compute the flow through the element given both terminal efforts
    /// (flow reference: from port 0 toward port 1).
    pub fn flow_from_efforts(&self, e0: Real, e1: Real) -> EngineResult<Real> {
        let q = match self {
            Dissipator::Linear { resistance } => (e0 - e1) / resistance,
            Dissipator::LogGradient { k_a, inlet_temps } => {
                let (t_hot_in, t_cold_in) = inlet_temps.unwrap_or((e0, e1));
                let dt1 = t_hot_in - e1;
                let dt2 = e0 - t_cold_in;
                k_a * log_mean(dt1, dt2)?
            }
            Dissipator::InflowAdjusted {
                k_a,
                inlet_temps,
                inflows,
            } => {
                let dt_d = e0 - e1;
                let (t_in_0, t_in_1) = inlet_temps.unwrap_or((e0, e1));
                let dt_f = t_in_0 - t_in_1;
                let counter_factor = match inflows {
                    Some((m0, m1)) if m0.abs() + m1.abs() > 0.0 => {
                        1.0 - ((m0 + m1) / (m0.abs() + m1.abs())).abs()
                    }
                    _ => 0.0,
                };
                k_a * (dt_d + dt_f * counter_factor * 0.5)
            }
        };
        ensure_finite(q, "dissipator flow")
    }

    /// Derive the far-side effort from the near-side effort and the flow
    /// into the element there: `e_other = e_this − R·q_this`.
    ///
    /// Only the linear law is invertible.
    pub fn effort_from_flow(&self, e_this: Real, q_this: Real) -> Option<Real> {
        match self {
            Dissipator::Linear { resistance } => Some(e_this - resistance * q_this),
            _ => None,
        }
    }

    /// Supply the external inlet temperatures of the nonlinear laws.
    pub fn set_inlet_temperatures(&mut self, hot: Real, cold: Real) -> EngineResult<()> {
        match self {
            Dissipator::LogGradient { inlet_temps, .. }
            | Dissipator::InflowAdjusted { inlet_temps, .. } => {
                *inlet_temps = Some((hot, cold));
                Ok(())
            }
            Dissipator::Linear { .. } => Err(EngineError::model(
                "linear dissipator takes no inlet temperatures",
            )),
        }
    }

    /// Supply the attached circuit mass flows of the inflow-adjusted law.
    pub fn set_inflows(&mut self, m0: Real, m1: Real) -> EngineResult<()> {
        match self {
            Dissipator::InflowAdjusted { inflows, .. } => {
                *inflows = Some((m0, m1));
                Ok(())
            }
            _ => Err(EngineError::model(
                "only the inflow-adjusted dissipator takes circuit flows",
            )),
        }
    }
}

/// Log-mean of two temperature differences, with the removable-singularity
/// limit at ΔT₁ = ΔT₂.
fn log_mean(dt1: Real, dt2: Real) -> EngineResult<Real> {
    if (dt1 - dt2).abs() < LOG_MEAN_GUARD {
        return Ok(dt1);
    }
    let ratio = dt1 / dt2;
    if ratio <= 0.0 {
        return Err(EngineError::calculation(
            "log-mean temperature difference undefined for opposed gradients",
        ));
    }
    Ok((dt1 - dt2) / ratio.ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_flow_and_inverse() {
        let d = Dissipator::linear(1e5).unwrap();
        let q = d.flow_from_efforts(10e5, 0.0).unwrap();
        assert_eq!(q, 10.0);

        // e_other from the near-side effort and the flow into the element.
        assert_eq!(d.effort_from_flow(10e5, 10.0), Some(0.0));
        assert_eq!(d.effort_from_flow(0.0, -10.0), Some(10e5));
    }

    #[test]
    fn linear_rejects_bad_resistance() {
        assert!(Dissipator::linear(0.0).is_err());
        assert!(Dissipator::linear(-1.0).is_err());
        assert!(Dissipator::linear(Real::NAN).is_err());
    }

    #[test]
    fn log_mean_limit_at_equal_gradients() {
        assert_eq!(log_mean(10.0, 10.0).unwrap(), 10.0);
        let lm = log_mean(20.0, 10.0).unwrap();
        // Between the two and below the arithmetic mean.
        assert!(lm > 10.0 && lm < 15.0);
    }

    #[test]
    fn log_mean_rejects_opposed_gradients() {
        assert!(log_mean(10.0, -10.0).is_err());
    }

    #[test]
    fn inflow_adjusted_counterflow_factor() {
        let mut d = Dissipator::InflowAdjusted {
            k_a: 2.0,
            inlet_temps: None,
            inflows: None,
        };
        d.set_inlet_temperatures(360.0, 300.0).unwrap();

        // Perfect counterflow (opposed equal flows): factor 1.
        d.set_inflows(1.0, -1.0).unwrap();
        let q_counter = d.flow_from_efforts(340.0, 320.0).unwrap();
        // ΔT_D = 20, ΔT_F = 60, cf = 1 → q = 2·(20 + 30) = 100.
        assert_eq!(q_counter, 100.0);

        // Parallel flow: factor 0, only the direct difference remains.
        d.set_inflows(1.0, 1.0).unwrap();
        let q_parallel = d.flow_from_efforts(340.0, 320.0).unwrap();
        assert_eq!(q_parallel, 40.0);
    }

    #[test]
    fn nonlinear_law_is_not_invertible() {
        let d = Dissipator::LogGradient {
            k_a: 1.0,
            inlet_temps: None,
        };
        assert_eq!(d.effort_from_flow(300.0, 5.0), None);
    }
}
