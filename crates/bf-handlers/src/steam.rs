//! Steam-extension handlers.
//!
//! The steam extension carries a `(T, h, s, x)` 4-tuple per slot and the
//! pressure on the node effort. All property lookups go through the shared
//! steam table.

use bf_core::{EngineError, EngineResult, RESIDUAL_FLOW, Real, Tolerances, ensure_finite};
use bf_graph::{Node, Port, SteamProps};

use crate::ctx::HandlerCtx;

/// Two-port isenthalpic pass-through (valves, flow resistors).
///
/// Once both flows and both pressures are derived, the known side's
/// enthalpy crosses unchanged and `T`, `s`, `x` are re-derived at the far
/// pressure. Zero flow on either side degrades both sides to no-properties.
#[derive(Debug, Clone)]
pub struct IsenthalpicExpansion {
    done: bool,
}

impl IsenthalpicExpansion {
    pub fn new() -> Self {
        Self { done: false }
    }

    pub fn prepare(&mut self) {
        self.done = false;
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        if self.done || ctx.ports.len() != 2 {
            return Ok(false);
        }
        if !ctx.all_flows_updated() {
            return Ok(false);
        }

        if ctx.all_flows_residual()? {
            let mut did = false;
            for i in 0..2 {
                let slot = ctx.steam_slot_mut(i)?;
                if !slot.is_updated() {
                    did |= slot.set_no_value()?;
                }
            }
            self.done = true;
            return Ok(did);
        }

        // Both pressures must be derived before enthalpy can cross.
        for i in 0..2 {
            if !ctx.node(ctx.ports[i]).effort_is_updated() {
                return Ok(false);
            }
        }

        let source = if ctx.steam_slot(0)?.has_value() {
            Some(0)
        } else if ctx.steam_slot(1)?.has_value() {
            Some(1)
        } else {
            None
        };
        let src = match source {
            Some(i) => i,
            None => return Ok(false),
        };
        let dst = 1 - src;
        if ctx.steam_slot(dst)?.is_updated() {
            self.done = true;
            return Ok(false);
        }

        let h = ctx.steam_slot(src)?.props()?.h;
        let p_dst = ctx.node(ctx.ports[dst]).effort()?;
        let props = ctx.steam_props_ph(p_dst, h)?;
        let did = ctx.steam_slot_mut(dst)?.set(props, Tolerances::default())?;
        self.done = true;
        Ok(did)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        ports
            .iter()
            .all(|&p| crate::ctx::steam_slot_updated(nodes, p))
    }
}

impl Default for IsenthalpicExpansion {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-phase reservoir separating a saturated mixture into liquid and vapor
/// outflows.
///
/// Each port is configured `is_liquid`; outflow through it carries the
/// corresponding saturation branch at the reservoir pressure. The next
/// state follows from an absolute enthalpy balance, mapped back to a
/// temperature through a linear `T(h)` fit taken at initialization between
/// two calibration temperatures, and the reservoir pressure is
/// `max(p_ambient, pSat(T))` — which the owning element imposes as its
/// effort.
#[derive(Debug, Clone)]
pub struct SaturatedSeparation {
    t_state: Real,
    h_state: Real,
    total_mass: Real,
    pressure: Real,
    p_ambient: Real,
    fit_slope: Real,
    fit_offset: Real,
    /// Calibration temperatures of the `T(h)` fit, kept for state capture.
    t_low: Real,
    t_high: Real,
    liquid_ports: Vec<bool>,

    next_t: Real,
    next_h: Real,
    next_mass: Real,
    next_pressure: Real,
    state_prepared: bool,
    integrated: bool,
    step_time: Real,
}

impl SaturatedSeparation {
    /// Build an uninitialized reservoir; `initialize` must run before use.
    pub fn new(liquid_ports: Vec<bool>) -> Self {
        Self {
            t_state: 0.0,
            h_state: 0.0,
            total_mass: 0.0,
            pressure: 0.0,
            p_ambient: 0.0,
            fit_slope: 0.0,
            fit_offset: 0.0,
            t_low: 0.0,
            t_high: 0.0,
            liquid_ports,
            next_t: 0.0,
            next_h: 0.0,
            next_mass: 0.0,
            next_pressure: 0.0,
            state_prepared: false,
            integrated: false,
            step_time: 0.0,
        }
    }

    /// Fit the linear `T(h)` approximation and seed the state.
    pub fn initialize(
        &mut self,
        table: &dyn bf_steam::SteamTable,
        t_init: Real,
        stored_mass: Real,
        t_low: Real,
        t_high: Real,
        p_ambient: Real,
    ) -> EngineResult<()> {
        if stored_mass <= 0.0 {
            return Err(EngineError::model("reservoir mass must be positive"));
        }
        if t_high <= t_low {
            return Err(EngineError::model(
                "reservoir calibration temperatures must be ordered",
            ));
        }
        let h_low = table.h_liq_p(table.p_sat_t(t_low)?)?;
        let h_high = table.h_liq_p(table.p_sat_t(t_high)?)?;
        self.fit_slope = (t_high - t_low) / (h_high - h_low);
        self.fit_offset = t_low - self.fit_slope * h_low;
        self.t_low = t_low;
        self.t_high = t_high;
        self.t_state = t_init;
        self.h_state = (t_init - self.fit_offset) / self.fit_slope;
        self.total_mass = stored_mass;
        self.p_ambient = p_ambient;
        self.pressure = table.p_sat_t(t_init)?.max(p_ambient);
        self.state_prepared = false;
        Ok(())
    }

    pub fn set_step_time(&mut self, dt: Real) {
        self.step_time = dt;
    }

    /// The pressure the owning element must impose as its effort.
    pub fn imposed_effort(&self) -> Real {
        self.pressure
    }

    pub fn temperature(&self) -> Real {
        self.t_state
    }

    pub fn total_mass(&self) -> Real {
        self.total_mass
    }

    pub fn ambient_pressure(&self) -> Real {
        self.p_ambient
    }

    pub fn calibration(&self) -> (Real, Real) {
        (self.t_low, self.t_high)
    }

    pub fn prepare(&mut self) {
        if self.state_prepared {
            self.t_state = self.next_t;
            self.h_state = self.next_h;
            self.total_mass = self.next_mass;
            self.pressure = self.next_pressure;
            self.state_prepared = false;
        }
        self.integrated = false;
    }

    fn branch_props(&self, ctx: &HandlerCtx<'_>, liquid: bool) -> EngineResult<SteamProps> {
        let p = self.pressure;
        let t_sat = ctx.table.t_sat_p(p)?;
        if liquid {
            Ok(SteamProps::new(
                t_sat,
                ctx.table.h_liq_p(p)?,
                ctx.table.s_liq_p(p)?,
                0.0,
            ))
        } else {
            Ok(SteamProps::new(
                t_sat,
                ctx.table.h_steam_p(p)?,
                ctx.table.s_steam_p(p)?,
                1.0,
            ))
        }
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        if self.liquid_ports.len() != ctx.ports.len() {
            return Err(EngineError::model(format!(
                "'{}': reservoir port branch configuration does not match its {} ports",
                ctx.name,
                ctx.ports.len()
            )));
        }
        let mut did = false;

        // Outflow slots carry the configured saturation branch.
        for i in 0..ctx.ports.len() {
            if !ctx.flow_updated(i) {
                continue;
            }
            let v = ctx.flow(i)?;
            if ctx.steam_slot(i)?.is_updated() {
                continue;
            }
            if v < -RESIDUAL_FLOW {
                let props = self.branch_props(ctx, self.liquid_ports[i])?;
                did |= ctx.steam_slot_mut(i)?.set(props, Tolerances::default())?;
            } else if v.abs() <= RESIDUAL_FLOW {
                did |= ctx.steam_slot_mut(i)?.set_no_value()?;
            }
        }

        if self.integrated || !ctx.all_flows_updated() {
            return Ok(did);
        }

        // Enthalpy balance over one step; incoming states must be derived.
        let dt = self.step_time;
        let mut h_abs = self.total_mass * self.h_state;
        let mut m_next = self.total_mass;
        for i in 0..ctx.ports.len() {
            let v = ctx.flow(i)?;
            if v.abs() <= RESIDUAL_FLOW {
                continue;
            }
            let slot = ctx.steam_slot(i)?;
            if !slot.is_updated() {
                return Ok(did);
            }
            if slot.is_no_value() {
                continue;
            }
            h_abs += v * dt * slot.props()?.h;
            m_next += v * dt;
        }
        if m_next <= 0.0 {
            return Err(EngineError::model(format!(
                "'{}': reservoir mass would become non-positive ({m_next})",
                ctx.name
            )));
        }

        let h_next = h_abs / m_next;
        ensure_finite(h_next, "reservoir enthalpy")?;
        let t_next = self.fit_slope * h_next + self.fit_offset;
        self.next_t = t_next;
        self.next_h = h_next;
        self.next_mass = m_next;
        self.next_pressure = ctx.table.p_sat_t(t_next)?.max(self.p_ambient);
        self.state_prepared = true;
        self.integrated = true;
        Ok(true)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        self.integrated
            && ports
                .iter()
                .all(|&p| crate::ctx::steam_slot_updated(nodes, p))
    }

    /// Restore persisted state (initial-condition loading). The `T(h)` fit
    /// must already be in place.
    pub fn restore(
        &mut self,
        temperature: Real,
        inner_mass: Real,
        previous_pressure: Real,
        ambient_pressure: Real,
    ) -> EngineResult<()> {
        if self.fit_slope == 0.0 {
            return Err(EngineError::model(
                "reservoir must be initialized before state restore",
            ));
        }
        self.t_state = temperature;
        self.h_state = (temperature - self.fit_offset) / self.fit_slope;
        self.total_mass = inner_mass;
        self.pressure = previous_pressure;
        self.p_ambient = ambient_pressure;
        self.state_prepared = false;
        Ok(())
    }
}

/// Fixed-volume, expanding evaporator (isobaric-isochoric thermal transfer).
///
/// Normal direction: once the inlet flow (with its steam state), the coupled
/// thermal flow, and a pressure are known, an absolute enthalpy balance over
/// one step yields the new specific enthalpy; the volume excess over the
/// fixed V leaves through the outlet. Inside the dome the expelled stream is
/// saturated vapor; with a subcooled inlet crossing saturation the volume
/// splits into a liquid and a vapor zone. A mass deficit (suction) is
/// buffered in `negative_mass` and drained by later surpluses.
///
/// Reverse direction (outlet drawn first): a two-step calculation — an
/// induced inlet flow assuming unchanged specific enthalpy, then, when the
/// incoming properties arrive, the closing balance records
/// `reverse_out_mass_correction` for the next cycle. The reverse path is
/// coarse by construction; treat its results as an approximation.
#[derive(Debug, Clone)]
pub struct IsobaricIsochoric {
    volume: Real,
    inner_mass: Real,
    h_state: Real,
    negative_mass: Real,
    reverse_out_mass_correction: Real,
    previous_pressure: Real,
    thermal_port: Option<Port>,

    next_inner_mass: Real,
    next_h: Real,
    state_prepared: bool,
    integrated: bool,
    reverse_induced: bool,
    step_time: Real,
}

impl IsobaricIsochoric {
    pub fn new(volume: Real) -> Self {
        Self {
            volume,
            inner_mass: 0.0,
            h_state: 0.0,
            negative_mass: 0.0,
            reverse_out_mass_correction: 0.0,
            previous_pressure: 0.0,
            thermal_port: None,
            next_inner_mass: 0.0,
            next_h: 0.0,
            state_prepared: false,
            integrated: false,
            reverse_induced: false,
            step_time: 0.0,
        }
    }

    /// Seed the state from pressure and temperature; the inner mass fills
    /// the fixed volume at that state.
    pub fn initialize(
        &mut self,
        table: &dyn bf_steam::SteamTable,
        p: Real,
        t: Real,
    ) -> EngineResult<()> {
        let h = table.h_pt(p, t)?;
        let v = table.v_ph(p, h)?;
        self.h_state = h;
        self.inner_mass = self.volume / v;
        self.previous_pressure = p;
        self.state_prepared = false;
        Ok(())
    }

    pub fn set_thermal_port(&mut self, port: Port) {
        self.thermal_port = Some(port);
    }

    pub fn set_step_time(&mut self, dt: Real) {
        self.step_time = dt;
    }

    pub fn inner_mass(&self) -> Real {
        self.inner_mass
    }

    pub fn heat_energy(&self) -> Real {
        self.h_state
    }

    pub fn negative_mass(&self) -> Real {
        self.negative_mass
    }

    pub fn previous_pressure(&self) -> Real {
        self.previous_pressure
    }

    pub fn restore(
        &mut self,
        heat_energy: Real,
        inner_mass: Real,
        negative_mass: Real,
        previous_pressure: Real,
    ) {
        self.h_state = heat_energy;
        self.inner_mass = inner_mass;
        self.negative_mass = negative_mass;
        self.previous_pressure = previous_pressure;
        self.state_prepared = false;
    }

    pub fn prepare(&mut self) {
        if self.state_prepared {
            self.inner_mass = self.next_inner_mass;
            self.h_state = self.next_h;
            self.state_prepared = false;
        }
        self.integrated = false;
        self.reverse_induced = false;
    }

    /// Pressure seen by the element: either node's derived effort, falling
    /// back to the committed previous-cycle pressure.
    fn pressure(&self, ctx: &HandlerCtx<'_>) -> Option<Real> {
        for i in 0..ctx.ports.len() {
            let node = ctx.node(ctx.ports[i]);
            if node.effort_is_updated() {
                return node.effort().ok();
            }
        }
        if self.previous_pressure > 0.0 {
            Some(self.previous_pressure)
        } else {
            None
        }
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        if ctx.ports.len() != 2 {
            return Err(EngineError::model(format!(
                "'{}': evaporator needs exactly an inlet and an outlet",
                ctx.name
            )));
        }
        let mut did = false;

        // Isobaric: a pressure known on one side crosses to the other.
        let e0 = ctx.node(ctx.ports[0]).effort_is_updated();
        let e1 = ctx.node(ctx.ports[1]).effort_is_updated();
        if e0 != e1 {
            let src = if e0 { ctx.ports[0] } else { ctx.ports[1] };
            let dst = if e0 { ctx.ports[1] } else { ctx.ports[0] };
            let p = ctx.node(src).effort()?;
            did |= ctx.node_mut(dst).set_effort(p)?;
        }

        if self.integrated {
            return Ok(did);
        }

        // Reverse direction: the outlet was drawn before the inlet resolved.
        if !self.reverse_induced && !ctx.flow_updated(0) && ctx.flow_updated(1) {
            let v_out = ctx.flow(1)?;
            // Refill the volume deficit at unchanged specific enthalpy: the
            // induced inlet flow mirrors the drawn mass.
            let p = ctx.ports[0];
            did |= ctx.nodes[p.node.idx()].set_flow(p.slot, -v_out)?;
            self.reverse_induced = true;
            return Ok(did);
        }

        if !ctx.flow_updated(0) {
            return Ok(did);
        }
        let p = match self.pressure(ctx) {
            Some(p) => p,
            None => return Ok(did),
        };

        // Coupled thermal source flow, if wired.
        let q_dot = match self.thermal_port {
            Some(tp) => {
                let node = &ctx.nodes[tp.node.idx()];
                if !node.flow_is_updated(tp.slot) {
                    return Ok(did);
                }
                node.flow(tp.slot)?
            }
            None => 0.0,
        };

        let dt = self.step_time;
        let v_in = ctx.flow(0)?;

        // Incoming enthalpy: the inlet state for true inflow, the stored
        // state when flow reverses out through the inlet.
        let h_in = if v_in > RESIDUAL_FLOW {
            let slot = ctx.steam_slot(0)?;
            if !slot.is_updated() {
                return Ok(did);
            }
            if slot.is_no_value() {
                return Err(EngineError::calculation(format!(
                    "'{}': evaporator inlet flows but carries no steam state",
                    ctx.name
                )));
            }
            slot.props()?.h
        } else {
            self.h_state
        };

        let h_abs = self.inner_mass * self.h_state + v_in * dt * h_in + q_dot * dt;
        let m_tot = self.inner_mass + v_in * dt;
        if m_tot <= 0.0 {
            return Err(EngineError::model(format!(
                "'{}': evaporator inventory would become non-positive",
                ctx.name
            )));
        }
        let h_next = h_abs / m_tot;
        ensure_finite(h_next, "evaporator enthalpy")?;

        let h_liq = ctx.table.h_liq_p(p)?;
        let h_vap = ctx.table.h_steam_p(p)?;
        let v_next = ctx.table.v_ph(p, h_next)?;
        let in_dome = h_next > h_liq && h_next < h_vap;

        // Mass that has to leave to keep the fixed volume.
        let (mut dm, expelled_h, expelled_vapor) = if in_dome
            && v_in > RESIDUAL_FLOW
            && h_in < h_liq
        {
            // Subcooled inlet crossing saturation: split the volume into a
            // liquid zone (still at inlet state) and a boiling zone.
            let v_zone_liq = (h_liq - h_in) / (h_next - h_in) * self.volume;
            let v_zone_vap = self.volume - v_zone_liq;
            let m_liq = v_zone_liq / ctx.table.v_ph(p, h_in)?;
            let m_vap = v_zone_vap / v_next;
            (m_tot - m_liq - m_vap, h_vap, true)
        } else if in_dome {
            // Boiling inventory: the volume excess leaves as saturated vapor.
            let dv = m_tot * v_next - self.volume;
            let v_sat_vap = ctx.table.v_ph(p, h_vap)?;
            (dv / v_sat_vap, h_vap, true)
        } else {
            // Single phase: excess leaves at the mixture state.
            ((m_tot * v_next - self.volume) / v_next, h_next, false)
        };

        // Correction recorded by a previous reverse cycle.
        dm += self.reverse_out_mass_correction;
        self.reverse_out_mass_correction = 0.0;

        // Suction is buffered, never emitted; surpluses drain the buffer.
        if dm < 0.0 {
            self.negative_mass += -dm;
            dm = 0.0;
        } else {
            let drained = self.negative_mass.min(dm);
            dm -= drained;
            self.negative_mass -= drained;
        }

        if self.reverse_induced {
            // Close the reverse balance: what actually left is what was
            // drawn; the difference to the proper expulsion carries over.
            let v_out = ctx.flow(1)?;
            let drawn = (-v_out * dt).max(0.0);
            self.reverse_out_mass_correction = dm - drawn;
            self.next_inner_mass = m_tot - drawn;
            self.next_h = h_next;
        } else {
            let out_rate = dm / dt;
            {
                let port = ctx.ports[1];
                did |= ctx.nodes[port.node.idx()].set_flow(port.slot, -out_rate)?;
            }
            self.next_inner_mass = m_tot - dm;
            // Vapor leaves enthalpy-rich; the inventory keeps the rest.
            self.next_h = if expelled_vapor && dm > 0.0 {
                (h_abs - dm * h_vap) / (m_tot - dm)
            } else {
                h_next
            };
        }

        // Outlet steam state.
        {
            let out_flow = ctx.flow(1)?;
            if out_flow.abs() <= RESIDUAL_FLOW {
                let slot = ctx.steam_slot_mut(1)?;
                if !slot.is_updated() {
                    did |= slot.set_no_value()?;
                }
            } else if out_flow < 0.0 {
                let props = if expelled_vapor {
                    SteamProps::new(
                        ctx.table.t_sat_p(p)?,
                        h_vap,
                        ctx.table.s_steam_p(p)?,
                        1.0,
                    )
                } else {
                    ctx.steam_props_ph(p, expelled_h)?
                };
                let slot = ctx.steam_slot_mut(1)?;
                if !slot.is_updated() {
                    did |= slot.set(props, Tolerances::default())?;
                }
            }
        }

        self.previous_pressure = p;
        self.state_prepared = true;
        self.integrated = true;
        Ok(true)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        self.integrated
            && ports
                .iter()
                .all(|&p| crate::ctx::steam_slot_updated(nodes, p))
    }
}
