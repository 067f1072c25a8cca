//! Calculation context handed to handlers by the element step.

use bf_core::{EngineResult, RESIDUAL_FLOW, Real};
use bf_graph::{Node, Port, ScalarSlot, SteamProps, SteamSlot};
use bf_steam::SteamTable;

/// Borrowed view a handler works through during one calculation.
///
/// `ports` are the owning element's attachments in connection order; the
/// node arena is the whole network's. Handlers address slots strictly via
/// `(node, slot)` pairs.
pub struct HandlerCtx<'a> {
    /// Owning element's name, for diagnostics.
    pub name: &'a str,
    /// The owning element's attachments, in connection order.
    pub ports: &'a [Port],
    /// The network's node arena.
    pub nodes: &'a mut [Node],
    /// Shared property oracle.
    pub table: &'a dyn SteamTable,
}

impl<'a> HandlerCtx<'a> {
    pub fn node(&self, port: Port) -> &Node {
        &self.nodes[port.node.idx()]
    }

    pub fn node_mut(&mut self, port: Port) -> &mut Node {
        &mut self.nodes[port.node.idx()]
    }

    /// Flow on the i-th port, if derived (node → element positive).
    pub fn flow(&self, i: usize) -> EngineResult<Real> {
        let p = self.ports[i];
        self.node(p).flow(p.slot)
    }

    pub fn flow_updated(&self, i: usize) -> bool {
        let p = self.ports[i];
        self.node(p).flow_is_updated(p.slot)
    }

    /// True once every port flow of the element is derived.
    pub fn all_flows_updated(&self) -> bool {
        (0..self.ports.len()).all(|i| self.flow_updated(i))
    }

    /// True when every derived port flow is a numerical residual.
    pub fn all_flows_residual(&self) -> EngineResult<bool> {
        for i in 0..self.ports.len() {
            if self.flow(i)?.abs() > RESIDUAL_FLOW {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn scalar_slot(&self, i: usize) -> EngineResult<&ScalarSlot> {
        let p = self.ports[i];
        self.node(p).scalar_slot(p.slot)
    }

    pub fn scalar_slot_mut(&mut self, i: usize) -> EngineResult<&mut ScalarSlot> {
        let p = self.ports[i];
        self.nodes[p.node.idx()].scalar_slot_mut(p.slot)
    }

    pub fn steam_slot(&self, i: usize) -> EngineResult<&SteamSlot> {
        let p = self.ports[i];
        self.node(p).steam_slot(p.slot)
    }

    pub fn steam_slot_mut(&mut self, i: usize) -> EngineResult<&mut SteamSlot> {
        let p = self.ports[i];
        self.nodes[p.node.idx()].steam_slot_mut(p.slot)
    }

    /// Build a full steam 4-tuple from pressure and enthalpy via the table.
    pub fn steam_props_ph(&self, p: Real, h: Real) -> EngineResult<SteamProps> {
        Ok(SteamProps::new(
            self.table.t_ph(p, h)?,
            h,
            self.table.s_ph(p, h)?,
            self.table.x_ph(p, h)?,
        ))
    }
}

/// Read-only completion checks used by `is_finished`, which must not borrow
/// the arena mutably.
pub fn scalar_slot_updated(nodes: &[Node], port: Port) -> bool {
    nodes[port.node.idx()]
        .scalar_slot(port.slot)
        .map(|s| s.is_updated())
        .unwrap_or(false)
}

pub fn steam_slot_updated(nodes: &[Node], port: Port) -> bool {
    nodes[port.node.idx()]
        .steam_slot(port.slot)
        .map(|s| s.is_updated())
        .unwrap_or(false)
}
