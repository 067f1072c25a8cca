//! Expanding thermal exchanger for the phased-fluid extension.

use bf_core::{EngineError, EngineResult, RESIDUAL_FLOW, Real, Tolerances, ensure_finite};
use bf_graph::{Node, Port};

use crate::ctx::HandlerCtx;

/// Phased-fluid analog of the fixed-volume evaporator.
///
/// The carried scalar is heat-energy [J/kg]. Inbound energy accumulates in
/// the inner heated mass; energy above the configured vaporization level
/// converts to outflow mass through the specific vaporization energy.
/// Suction deficits buffer in `negative_mass`; energy that arrives after the
/// outflow for the cycle was already emitted is held in
/// `delayed_in_heat_energy` and folded into the next cycle's balance.
#[derive(Debug, Clone)]
pub struct PhasedExpanding {
    /// Heat-energy at which the carrier starts converting to outflow [J/kg].
    pub vaporization_level: Real,
    /// Energy consumed per expelled kilogram [J/kg].
    pub vaporization_energy: Real,

    inner_heated_mass: Real,
    heat_energy: Real,
    negative_mass: Real,
    delayed_in_heat_energy: Real,
    thermal_port: Option<Port>,

    next_mass: Real,
    next_energy: Real,
    state_prepared: bool,
    integrated: bool,
    reverse_induced: bool,
    step_time: Real,
}

impl PhasedExpanding {
    pub fn new(vaporization_level: Real, vaporization_energy: Real) -> Self {
        Self {
            vaporization_level,
            vaporization_energy,
            inner_heated_mass: 0.0,
            heat_energy: 0.0,
            negative_mass: 0.0,
            delayed_in_heat_energy: 0.0,
            thermal_port: None,
            next_mass: 0.0,
            next_energy: 0.0,
            state_prepared: false,
            integrated: false,
            reverse_induced: false,
            step_time: 0.0,
        }
    }

    pub fn set_thermal_port(&mut self, port: Port) {
        self.thermal_port = Some(port);
    }

    pub fn set_step_time(&mut self, dt: Real) {
        self.step_time = dt;
    }

    pub fn set_initial(&mut self, heat_energy: Real, inner_heated_mass: Real) -> EngineResult<()> {
        if inner_heated_mass <= 0.0 {
            return Err(EngineError::model("inner heated mass must be positive"));
        }
        self.heat_energy = heat_energy;
        self.inner_heated_mass = inner_heated_mass;
        self.state_prepared = false;
        Ok(())
    }

    pub fn heat_energy(&self) -> Real {
        self.heat_energy
    }

    pub fn inner_heated_mass(&self) -> Real {
        self.inner_heated_mass
    }

    pub fn negative_mass(&self) -> Real {
        self.negative_mass
    }

    pub fn delayed_in_heat_energy(&self) -> Real {
        self.delayed_in_heat_energy
    }

    pub fn restore(
        &mut self,
        heat_energy: Real,
        inner_heated_mass: Real,
        negative_mass: Real,
        delayed_in_heat_energy: Real,
    ) {
        self.heat_energy = heat_energy;
        self.inner_heated_mass = inner_heated_mass;
        self.negative_mass = negative_mass;
        self.delayed_in_heat_energy = delayed_in_heat_energy;
        self.state_prepared = false;
    }

    pub fn prepare(&mut self) {
        if self.state_prepared {
            self.inner_heated_mass = self.next_mass;
            self.heat_energy = self.next_energy;
            self.state_prepared = false;
        }
        self.integrated = false;
        self.reverse_induced = false;
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        if ctx.ports.len() != 2 {
            return Err(EngineError::model(format!(
                "'{}': expanding exchanger needs exactly an inlet and an outlet",
                ctx.name
            )));
        }
        if self.integrated {
            return Ok(false);
        }

        // Reverse direction: outlet drawn before the inlet resolved. Mirror
        // the draw as an induced inlet flow; the energy it carries arrives a
        // cycle late through the delayed buffer.
        if !self.reverse_induced && !ctx.flow_updated(0) && ctx.flow_updated(1) {
            let v_out = ctx.flow(1)?;
            let p = ctx.ports[0];
            let did = ctx.nodes[p.node.idx()].set_flow(p.slot, -v_out)?;
            self.reverse_induced = true;
            return Ok(did);
        }

        if !ctx.flow_updated(0) {
            return Ok(false);
        }

        let q_dot = match self.thermal_port {
            Some(tp) => {
                let node = &ctx.nodes[tp.node.idx()];
                if !node.flow_is_updated(tp.slot) {
                    return Ok(false);
                }
                node.flow(tp.slot)?
            }
            None => 0.0,
        };

        let dt = self.step_time;
        let v_in = ctx.flow(0)?;

        let e_in = if v_in > RESIDUAL_FLOW {
            let slot = ctx.scalar_slot(0)?;
            if !slot.is_updated() {
                return Ok(false);
            }
            if slot.is_no_value() {
                return Err(EngineError::calculation(format!(
                    "'{}': inlet flows but carries no heat-energy",
                    ctx.name
                )));
            }
            slot.value()?
        } else {
            self.heat_energy
        };

        if self.inner_heated_mass <= 0.0 {
            return Err(EngineError::model(format!(
                "'{}': expanding exchanger has no inner heated mass",
                ctx.name
            )));
        }

        let e_abs = self.inner_heated_mass * self.heat_energy
            + v_in * dt * e_in
            + q_dot * dt
            + self.delayed_in_heat_energy;
        self.delayed_in_heat_energy = 0.0;
        let m_tot = self.inner_heated_mass + v_in * dt;
        if m_tot <= 0.0 {
            return Err(EngineError::model(format!(
                "'{}': inventory would become non-positive",
                ctx.name
            )));
        }
        let e_next = e_abs / m_tot;
        ensure_finite(e_next, "expanding exchanger heat-energy")?;

        // Energy above the vaporization level converts to outflow mass.
        let (mut dm, e_retained) = if e_next > self.vaporization_level {
            let excess = m_tot * (e_next - self.vaporization_level);
            (excess / self.vaporization_energy, self.vaporization_level)
        } else {
            (0.0, e_next)
        };

        if dm < 0.0 {
            self.negative_mass += -dm;
            dm = 0.0;
        } else {
            let drained = self.negative_mass.min(dm);
            dm -= drained;
            self.negative_mass -= drained;
        }

        let e_out = self.vaporization_level + self.vaporization_energy;
        let mut did = false;
        if self.reverse_induced {
            let v_out = ctx.flow(1)?;
            let drawn = (-v_out * dt).max(0.0);
            // Energy the proper balance would have shipped but the draw did
            // not; carried into the next cycle.
            self.delayed_in_heat_energy = (dm - drawn) * e_out;
            self.next_mass = m_tot - drawn;
            self.next_energy = e_retained;
        } else {
            let out_rate = dm / dt;
            let port = ctx.ports[1];
            did |= ctx.nodes[port.node.idx()].set_flow(port.slot, -out_rate)?;
            self.next_mass = m_tot - dm;
            self.next_energy = e_retained;
        }

        // Outlet heat-energy.
        {
            let out_flow = ctx.flow(1)?;
            let slot = ctx.scalar_slot_mut(1)?;
            if !slot.is_updated() {
                if out_flow.abs() <= RESIDUAL_FLOW {
                    did |= slot.set_no_value()?;
                } else if out_flow < 0.0 {
                    did |= slot.set(e_out, Tolerances::default())?;
                }
            }
        }

        self.state_prepared = true;
        self.integrated = true;
        Ok(true)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        self.integrated
            && ports
                .iter()
                .all(|&p| crate::ctx::scalar_slot_updated(nodes, p))
    }
}
