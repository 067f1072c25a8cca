//! Inter-domain converters: two-port elements bridging the fluid extensions.

use bf_core::{EngineError, EngineResult, RESIDUAL_FLOW, Real};
use bf_graph::{Node, Port};
use bf_handlers::{Connection, ConnectionKind, HandlerCtx, ScalarKind};
use bf_steam::SteamTable;

/// Which extension pair the converter bridges. Port 0 always carries the
/// first-named side, port 1 the second.
#[derive(Debug, Clone, Copy)]
pub enum ConverterKind {
    /// Heat-fluid (temperature) ↔ steam state.
    HeatSteam,
    /// Heat-fluid (temperature) ↔ phased heat-energy; `cp` converts.
    HeatPhased { cp: Real },
    /// Phased heat-energy ↔ steam state (energy read as enthalpy).
    PhasedSteam,
}

impl ConverterKind {
    fn side_connection(self, side: usize) -> Connection {
        let kind = match (self, side) {
            (ConverterKind::HeatSteam, 0) => {
                ConnectionKind::Scalar(ScalarKind::Temperature { cp: 1.0 })
            }
            (ConverterKind::HeatSteam, _) => ConnectionKind::Steam,
            (ConverterKind::HeatPhased { cp }, 0) => {
                ConnectionKind::Scalar(ScalarKind::Temperature { cp })
            }
            (ConverterKind::HeatPhased { .. }, _) => ConnectionKind::Scalar(ScalarKind::HeatEnergy),
            (ConverterKind::PhasedSteam, 0) => ConnectionKind::Scalar(ScalarKind::HeatEnergy),
            (ConverterKind::PhasedSteam, _) => ConnectionKind::Steam,
        };
        Connection::new(kind)
    }
}

/// A two-port multi-domain element with one connection handler per side.
///
/// Per step: the pressure (effort) crosses between the two nodes, the signed
/// flow crosses with opposite sign, and the flow direction selects which
/// side is the sink; the sink-side connection handler receives the converted
/// scalar. Zero flow marks both sides as carrying nothing; inconsistent
/// directions are a calculation error.
#[derive(Debug, Clone)]
pub struct Converter {
    pub kind: ConverterKind,
    side_a: Connection,
    side_b: Connection,
}

impl Converter {
    pub fn new(kind: ConverterKind) -> Self {
        Self {
            kind,
            side_a: kind.side_connection(0),
            side_b: kind.side_connection(1),
        }
    }

    fn side(&self, i: usize) -> &Connection {
        if i == 0 { &self.side_a } else { &self.side_b }
    }

    pub fn step(
        &mut self,
        name: &str,
        ports: &[Port],
        nodes: &mut [Node],
        table: &dyn SteamTable,
    ) -> EngineResult<bool> {
        if ports.len() != 2 {
            return Err(EngineError::model(format!(
                "converter '{name}' needs exactly two attachments"
            )));
        }
        let mut did = false;

        // Pressure crosses unchanged.
        let (e0, e1) = (
            nodes[ports[0].node.idx()].effort_is_updated(),
            nodes[ports[1].node.idx()].effort_is_updated(),
        );
        if e0 && !e1 {
            let p = nodes[ports[0].node.idx()].effort()?;
            did |= nodes[ports[1].node.idx()].set_effort(p)?;
        } else if e1 && !e0 {
            let p = nodes[ports[1].node.idx()].effort()?;
            did |= nodes[ports[0].node.idx()].set_effort(p)?;
        }

        // Flow crosses with opposite sign.
        let f0 = nodes[ports[0].node.idx()].flow_is_updated(ports[0].slot);
        let f1 = nodes[ports[1].node.idx()].flow_is_updated(ports[1].slot);
        if f0 && !f1 {
            let v = nodes[ports[0].node.idx()].flow(ports[0].slot)?;
            did |= nodes[ports[1].node.idx()].set_flow(ports[1].slot, -v)?;
        } else if f1 && !f0 {
            let v = nodes[ports[1].node.idx()].flow(ports[1].slot)?;
            did |= nodes[ports[0].node.idx()].set_flow(ports[0].slot, -v)?;
        }
        if !(nodes[ports[0].node.idx()].flow_is_updated(ports[0].slot)
            && nodes[ports[1].node.idx()].flow_is_updated(ports[1].slot))
        {
            return Ok(did);
        }

        let v0 = nodes[ports[0].node.idx()].flow(ports[0].slot)?;
        let v1 = nodes[ports[1].node.idx()].flow(ports[1].slot)?;

        // Zero flow: neither side carries anything.
        if v0.abs() <= RESIDUAL_FLOW && v1.abs() <= RESIDUAL_FLOW {
            for i in 0..2 {
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[i]),
                    nodes: &mut *nodes,
                    table,
                };
                did |= self.side(i).set_no_value(&mut ctx)?;
            }
            return Ok(did);
        }

        // The inflowing side is the source.
        let (source, sink) = if v0 > RESIDUAL_FLOW && v1 < -RESIDUAL_FLOW {
            (0usize, 1usize)
        } else if v1 > RESIDUAL_FLOW && v0 < -RESIDUAL_FLOW {
            (1, 0)
        } else {
            return Err(EngineError::calculation(format!(
                "converter '{name}': inconsistent flow directions ({v0} / {v1})"
            )));
        };

        did |= self.transfer(name, ports, nodes, table, source, sink)?;
        Ok(did)
    }

    /// Read the source-side scalar and write its conversion onto the sink.
    fn transfer(
        &mut self,
        name: &str,
        ports: &[Port],
        nodes: &mut [Node],
        table: &dyn SteamTable,
        source: usize,
        sink: usize,
    ) -> EngineResult<bool> {
        let src_port = ports[source];
        let steam_source = matches!(
            (self.kind, source),
            (ConverterKind::HeatSteam, 1) | (ConverterKind::PhasedSteam, 1)
        );

        // Source scalar, waiting until the node distribution derives it; a
        // no-value source degrades the sink to no-value.
        let incoming: Option<Real> = if steam_source {
            let slot = nodes[src_port.node.idx()].steam_slot(src_port.slot)?;
            if !slot.is_updated() {
                return Ok(false);
            }
            if slot.is_no_value() {
                None
            } else {
                Some(slot.props()?.h)
            }
        } else {
            let slot = nodes[src_port.node.idx()].scalar_slot(src_port.slot)?;
            if !slot.is_updated() {
                return Ok(false);
            }
            if slot.is_no_value() {
                None
            } else {
                Some(slot.value()?)
            }
        };

        let sink_conn = if sink == 0 {
            self.side_a.clone()
        } else {
            self.side_b.clone()
        };
        let sink_port = ports[sink];
        let value = match incoming {
            Some(v) => v,
            None => {
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                return sink_conn.set_no_value(&mut ctx);
            }
        };

        match (self.kind, source) {
            // Temperature + pressure into a full steam state.
            (ConverterKind::HeatSteam, 0) => {
                if !nodes[sink_port.node.idx()].effort_is_updated() {
                    return Ok(false);
                }
                let p = nodes[sink_port.node.idx()].effort()?;
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                sink_conn.set_from_converter_pt(&mut ctx, p, value)
            }
            // Steam temperature onto the heat side.
            (ConverterKind::HeatSteam, 1) => {
                let t = {
                    let slot = nodes[src_port.node.idx()].steam_slot(src_port.slot)?;
                    slot.props()?.t
                };
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                sink_conn.set_from_converter(&mut ctx, t)
            }
            // Temperature to heat-energy and back.
            (ConverterKind::HeatPhased { cp }, 0) => {
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                sink_conn.set_from_converter(&mut ctx, value * cp)
            }
            (ConverterKind::HeatPhased { cp }, 1) => {
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                sink_conn.set_from_converter(&mut ctx, value / cp)
            }
            // Heat-energy read as enthalpy toward the steam side.
            (ConverterKind::PhasedSteam, 0) => {
                if !nodes[sink_port.node.idx()].effort_is_updated() {
                    return Ok(false);
                }
                let p = nodes[sink_port.node.idx()].effort()?;
                let props = {
                    let ctx = HandlerCtx {
                        name,
                        ports: std::slice::from_ref(&ports[sink]),
                        nodes: &mut *nodes,
                        table,
                    };
                    ctx.steam_props_ph(p, value)?
                };
                let slot = nodes[sink_port.node.idx()].steam_slot_mut(sink_port.slot)?;
                if slot.is_updated() {
                    Ok(false)
                } else {
                    slot.set(props, bf_core::Tolerances::default())
                }
            }
            // Steam enthalpy onto the phased side.
            (ConverterKind::PhasedSteam, 1) => {
                let mut ctx = HandlerCtx {
                    name,
                    ports: std::slice::from_ref(&ports[sink]),
                    nodes: &mut *nodes,
                    table,
                };
                sink_conn.set_from_converter(&mut ctx, value)
            }
            (kind, source) => Err(EngineError::model(format!(
                "converter '{name}' ({kind:?}) has no source port {source}"
            ))),
        }
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        for (i, p) in ports.iter().enumerate() {
            let node = &nodes[p.node.idx()];
            if !node.flow_is_updated(p.slot) {
                return false;
            }
            let steam_side = matches!(
                (self.kind, i),
                (ConverterKind::HeatSteam, 1) | (ConverterKind::PhasedSteam, 1)
            );
            let slot_done = if steam_side {
                node.steam_slot(p.slot).map(|s| s.is_updated()).unwrap_or(false)
            } else {
                node.scalar_slot(p.slot).map(|s| s.is_updated()).unwrap_or(false)
            };
            if !slot_done {
                return false;
            }
        }
        true
    }
}
