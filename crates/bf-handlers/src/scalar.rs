//! Scalar-transport handlers for the heat and phased fluid extensions.
//!
//! The heat family transports a temperature [K], the phased family a
//! heat-energy [J/kg]; their mixing and storage rules are symmetric, so
//! one implementation serves both, parameterized by [`ScalarKind`].

use bf_core::{EngineError, EngineResult, RESIDUAL_FLOW, Real};
use bf_graph::{Node, Port};

use crate::ctx::HandlerCtx;

/// Which scalar the handler transports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarKind {
    /// Temperature [K]; `cp` converts between heat flow and temperature.
    Temperature { cp: Real },
    /// Heat-energy [J/kg]; heat flow maps onto it directly.
    HeatEnergy,
}

impl ScalarKind {
    /// Divisor applied to a conductive heat term in the storage update.
    pub(crate) fn thermal_divisor(self) -> Real {
        match self {
            ScalarKind::Temperature { cp } => cp,
            ScalarKind::HeatEnergy => 1.0,
        }
    }
}

/// Simple mixing handler: the element has no capacity of its own.
///
/// Once every incident flow is derived, incoming scalars (positive flow,
/// toward the element) mix mass-weighted onto every leaving slot. Incoming
/// slots marked `no_value` (numerical-residual streams) are skipped. The
/// all-zero-flow case marks every open slot `no_value`.
#[derive(Debug, Clone)]
pub struct Mix {
    pub kind: ScalarKind,
}

impl Mix {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        if !ctx.all_flows_updated() {
            return Ok(false);
        }
        if self.is_finished(ctx.ports, ctx.nodes) {
            return Ok(false);
        }

        if ctx.all_flows_residual()? {
            let mut did = false;
            for i in 0..ctx.ports.len() {
                if !ctx.scalar_slot(i)?.is_updated() {
                    did |= ctx.scalar_slot_mut(i)?.set_no_value()?;
                }
            }
            return Ok(did);
        }

        // Element-side mixing: positive slot values flow toward the element.
        let mut m_sum = 0.0;
        let mut mx_sum = 0.0;
        for i in 0..ctx.ports.len() {
            let v = ctx.flow(i)?;
            if v > RESIDUAL_FLOW {
                let slot = ctx.scalar_slot(i)?;
                if !slot.is_updated() {
                    return Ok(false);
                }
                if slot.is_no_value() {
                    continue;
                }
                m_sum += v;
                mx_sum += v * slot.value()?;
            }
        }

        let tol = bf_core::Tolerances::default();
        let mixed = if m_sum > 0.0 { Some(mx_sum / m_sum) } else { None };
        let mut did = false;
        for i in 0..ctx.ports.len() {
            let v = ctx.flow(i)?;
            let slot = ctx.scalar_slot_mut(i)?;
            if slot.is_updated() {
                continue;
            }
            if v < -RESIDUAL_FLOW {
                match mixed {
                    Some(x) => did |= slot.set(x, tol)?,
                    None => did |= slot.set_no_value()?,
                }
            } else {
                did |= slot.set_no_value()?;
            }
        }
        Ok(did)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        ports
            .iter()
            .all(|&p| crate::ctx::scalar_slot_updated(nodes, p))
    }
}

/// Storage handler with an inner scalar capacity and delayed out-scalar.
///
/// The element's own scalar is assigned to every leaving slot as soon as
/// that slot's flow direction is known; the next-cycle scalar mixes the
/// inner capacity with one timestep's worth of inflow:
///
/// ```text
/// next = (m_inner·x + Σ ṁ_in·Δt·x_in) / (m_inner + Σ ṁ_in·Δt)
/// ```
///
/// This delayed mixing is the key physical simplification: inflow reaches
/// the outlet one cycle later, through the capacity.
#[derive(Debug, Clone)]
pub struct Volumized {
    pub kind: ScalarKind,
    value: Real,
    next_value: Real,
    state_prepared: bool,
    inner_mass: Real,
    step_time: Real,
    integrated: bool,
}

impl Volumized {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            value: 0.0,
            next_value: 0.0,
            state_prepared: false,
            inner_mass: 0.0,
            step_time: 0.0,
            integrated: false,
        }
    }

    pub fn set_initial(&mut self, value: Real) {
        self.value = value;
        self.next_value = value;
        self.state_prepared = false;
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn next_value(&self) -> Real {
        self.next_value
    }

    pub fn inner_mass(&self) -> Real {
        self.inner_mass
    }

    pub fn set_inner_mass(&mut self, m: Real) -> EngineResult<()> {
        if !(m.is_finite() && m > 0.0) {
            return Err(EngineError::model("inner mass must be positive"));
        }
        self.inner_mass = m;
        Ok(())
    }

    pub fn set_step_time(&mut self, dt: Real) {
        self.step_time = dt;
    }

    pub fn prepare(&mut self) {
        if self.state_prepared {
            self.value = self.next_value;
            self.state_prepared = false;
        }
        self.integrated = false;
    }

    /// Core of the calculation, shared with the thermal-coupled variant.
    /// `heat_term` is the conductive heat drawn out of the capacity over one
    /// step, already divided by cp where applicable.
    fn calculate_with_heat(
        &mut self,
        ctx: &mut HandlerCtx<'_>,
        heat_term: Option<Real>,
    ) -> EngineResult<bool> {
        let mut did = false;
        let tol = bf_core::Tolerances::default();

        // Leaving slots carry the current (delayed) scalar as soon as their
        // direction is known; residual slots carry nothing.
        for i in 0..ctx.ports.len() {
            if !ctx.flow_updated(i) {
                continue;
            }
            let v = ctx.flow(i)?;
            let value = self.value;
            let slot = ctx.scalar_slot_mut(i)?;
            if slot.is_updated() {
                continue;
            }
            if v < -RESIDUAL_FLOW {
                did |= slot.set(value, tol)?;
            } else if v.abs() <= RESIDUAL_FLOW {
                did |= slot.set_no_value()?;
            }
        }

        if self.integrated || !ctx.all_flows_updated() {
            return Ok(did);
        }

        // Delayed mixing into the capacity once every inflow scalar is known.
        let mut m_in_dt = 0.0;
        let mut mx_in_dt = 0.0;
        for i in 0..ctx.ports.len() {
            let v = ctx.flow(i)?;
            if v > RESIDUAL_FLOW {
                let slot = ctx.scalar_slot(i)?;
                if !slot.is_updated() {
                    return Ok(did);
                }
                if slot.is_no_value() {
                    continue;
                }
                m_in_dt += v * self.step_time;
                mx_in_dt += v * self.step_time * slot.value()?;
            }
        }

        let heat = match heat_term {
            Some(q) => q,
            None => 0.0,
        };
        if self.inner_mass <= 0.0 {
            return Err(EngineError::model(format!(
                "'{}': storage handler has no inner mass",
                ctx.name
            )));
        }
        let denom = self.inner_mass + m_in_dt;
        let next = (self.inner_mass * self.value + mx_in_dt - heat) / denom;
        bf_core::ensure_finite(next, "storage handler next scalar")?;
        self.next_value = next;
        self.state_prepared = true;
        self.integrated = true;
        Ok(true)
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        self.calculate_with_heat(ctx, None)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        self.integrated
            && ports
                .iter()
                .all(|&p| crate::ctx::scalar_slot_updated(nodes, p))
    }
}

/// Volumized storage coupled to a thermal effort source.
///
/// The coupled source publishes the capacity's scalar as its effort at
/// `prepare` (done by the network, which owns both elements); its heat flow
/// enters the storage update as a conductive term:
///
/// ```text
/// next = (m·x + Σ ṁ_in·Δt·x_in − Q̇·Δt / c_p) / (m + Σ ṁ_in·Δt)
/// ```
///
/// `Q̇` is the heat the capacity loses to the thermal network; a flow
/// arriving at the source (thermal node toward the source) heats the
/// capacity.
#[derive(Debug, Clone)]
pub struct ThermalCoupled {
    pub inner: Volumized,
    /// Attachment of the coupled thermal effort source, for reading `Q̇`.
    thermal_port: Option<Port>,
    inbound_mass_sum: Real,
    inbound_heat_sum: Real,
}

impl ThermalCoupled {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            inner: Volumized::new(kind),
            thermal_port: None,
            inbound_mass_sum: 0.0,
            inbound_heat_sum: 0.0,
        }
    }

    pub fn set_thermal_port(&mut self, port: Port) {
        self.thermal_port = Some(port);
    }

    pub fn thermal_port(&self) -> Option<Port> {
        self.thermal_port
    }

    /// Inbound mass over the last integrated step [kg], for counterparts.
    pub fn inbound_mass_sum(&self) -> Real {
        self.inbound_mass_sum
    }

    /// Conductive heat over the last integrated step [J], for counterparts.
    pub fn inbound_heat_sum(&self) -> Real {
        self.inbound_heat_sum
    }

    pub fn prepare(&mut self) {
        self.inner.prepare();
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        let port = match self.thermal_port {
            Some(p) => p,
            None => {
                return Err(EngineError::model(format!(
                    "'{}': thermal-coupled handler has no thermal source attached",
                    ctx.name
                )));
            }
        };
        // The conductive term needs the thermal source's derived heat flow;
        // until it arrives, only the leaving slots can be assigned.
        let q_known = ctx.nodes[port.node.idx()].flow_is_updated(port.slot);
        if !q_known {
            return self.partial_assign(ctx);
        }
        let q_flow = ctx.nodes[port.node.idx()].flow(port.slot)?;
        let dt = self.inner.step_time;
        // Slot flow is node → source; heat arriving at the source enters
        // the capacity, so the drawn-out term carries the opposite sign.
        let heat = -q_flow * dt / self.inner.kind.thermal_divisor();
        let was_integrated = self.inner.integrated;
        let did = self.inner.calculate_with_heat(ctx, Some(heat))?;
        if !was_integrated && self.inner.integrated {
            self.inbound_heat_sum = q_flow * dt;
            self.inbound_mass_sum = 0.0;
            for i in 0..ctx.ports.len() {
                let v = ctx.flow(i)?;
                if v > RESIDUAL_FLOW {
                    self.inbound_mass_sum += v * dt;
                }
            }
        }
        Ok(did)
    }

    /// Assign leaving slots only (heat flow not yet known).
    fn partial_assign(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        let tol = bf_core::Tolerances::default();
        let mut did = false;
        for i in 0..ctx.ports.len() {
            if !ctx.flow_updated(i) {
                continue;
            }
            let v = ctx.flow(i)?;
            let value = self.inner.value;
            let slot = ctx.scalar_slot_mut(i)?;
            if slot.is_updated() {
                continue;
            }
            if v < -RESIDUAL_FLOW {
                did |= slot.set(value, tol)?;
            } else if v.abs() <= RESIDUAL_FLOW {
                did |= slot.set_no_value()?;
            }
        }
        Ok(did)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        self.inner.is_finished(ports, nodes)
    }
}
