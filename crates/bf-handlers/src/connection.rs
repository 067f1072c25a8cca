//! Single-port boundary handler between extensions.
//!
//! A connection handler sits on one side of an inter-domain converter and
//! writes a single scalar (or steam state) delivered by the converter onto
//! its port. It stores no state of its own; any state operation fails with
//! the missing-state-variable kind.

use bf_core::{EngineResult, Real, Tolerances};
use bf_graph::{Node, Port};
use bf_steam::SteamTable;

use crate::ctx::HandlerCtx;
use crate::scalar::ScalarKind;

/// What the connection port carries.
#[derive(Debug, Clone, Copy)]
pub enum ConnectionKind {
    Scalar(ScalarKind),
    Steam,
}

/// Single-port boundary between extensions.
#[derive(Debug, Clone)]
pub struct Connection {
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn new(kind: ConnectionKind) -> Self {
        Self { kind }
    }

    /// Write a scalar delivered by the converter onto the port.
    pub fn set_from_converter(&self, ctx: &mut HandlerCtx<'_>, value: Real) -> EngineResult<bool> {
        let slot = ctx.scalar_slot_mut(0)?;
        if slot.is_updated() {
            return Ok(false);
        }
        slot.set(value, Tolerances::default())
    }

    /// Translate an external `(p, T)` pair into a full steam state and write
    /// it onto the port.
    ///
    /// Superheat is spread over the saturated-liquid enthalpy with the heat
    /// capacity at that point; at or below saturation the table's own
    /// `h_pT` applies.
    pub fn set_from_converter_pt(
        &self,
        ctx: &mut HandlerCtx<'_>,
        p: Real,
        t: Real,
    ) -> EngineResult<bool> {
        if ctx.steam_slot(0)?.is_updated() {
            return Ok(false);
        }
        let table: &dyn SteamTable = ctx.table;
        let t_sat = table.t_sat_p(p)?;
        let h = if t > t_sat {
            let h_liq = table.h_liq_p(p)?;
            h_liq + table.c_ph(p, h_liq)? * (t - t_sat)
        } else {
            table.h_pt(p, t)?
        };
        let props = ctx.steam_props_ph(p, h)?;
        ctx.steam_slot_mut(0)?.set(props, Tolerances::default())
    }

    /// Mark the port as carrying nothing (zero converter flow).
    pub fn set_no_value(&self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        match self.kind {
            ConnectionKind::Scalar(_) => {
                let slot = ctx.scalar_slot_mut(0)?;
                if slot.is_updated() {
                    return Ok(false);
                }
                slot.set_no_value()
            }
            ConnectionKind::Steam => {
                let slot = ctx.steam_slot_mut(0)?;
                if slot.is_updated() {
                    return Ok(false);
                }
                slot.set_no_value()
            }
        }
    }

    /// The converter drives this handler; it derives nothing on its own.
    pub fn do_calculation(&mut self, _ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        Ok(false)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        match self.kind {
            ConnectionKind::Scalar(_) => crate::ctx::scalar_slot_updated(nodes, ports[0]),
            ConnectionKind::Steam => crate::ctx::steam_slot_updated(nodes, ports[0]),
        }
    }
}
