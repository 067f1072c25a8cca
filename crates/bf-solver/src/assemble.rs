//! Incremental model assembly.

use std::sync::Arc;

use bf_core::units::Time;
use bf_core::{ElemId, EngineError, EngineResult, NodeId};
use bf_elements::{Element, Kind};
use bf_graph::{Node, PhysicalDomain, Port};
use bf_handlers::Handler;
use bf_steam::{CurveFitTable, SteamTable};

use crate::network::Network;

/// Builder for constructing a network incrementally.
///
/// Add nodes and elements, connect them (connection order defines the
/// reference direction for flow), wire couplings and exchanger pairs, set
/// the step time, then `finish()` to validate and freeze the arena.
pub struct ModelBuilder {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    table: Arc<dyn SteamTable>,
    step_time: f64,
}

impl ModelBuilder {
    /// Create a builder with the bundled curve-fit steam table.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            elements: Vec::new(),
            table: Arc::new(CurveFitTable::new()),
            step_time: 0.0,
        }
    }

    /// Replace the property oracle.
    pub fn with_steam_table(mut self, table: Arc<dyn SteamTable>) -> Self {
        self.table = table;
        self
    }

    /// Add a node; the domain selects its extension container.
    pub fn add_node(&mut self, name: impl Into<String>, domain: PhysicalDomain) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, name, domain));
        id
    }

    /// Add an element. The category must be valid in the domain.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        domain: PhysicalDomain,
        kind: Kind,
    ) -> EngineResult<ElemId> {
        let name = name.into();
        if !kind.category().valid_in(domain) {
            return Err(EngineError::model(format!(
                "element '{name}': category {:?} is not valid in {domain:?}",
                kind.category()
            )));
        }
        let id = ElemId::from_index(self.elements.len() as u32);
        self.elements.push(Element::new(id, name, domain, kind));
        Ok(id)
    }

    /// Compose a scalar handler into an extension-domain element.
    pub fn set_handler(&mut self, elem: ElemId, handler: Handler) -> EngineResult<()> {
        self.elements[elem.idx()].set_handler(handler)
    }

    pub fn element(&self, elem: ElemId) -> &Element {
        &self.elements[elem.idx()]
    }

    pub fn element_mut(&mut self, elem: ElemId) -> &mut Element {
        &mut self.elements[elem.idx()]
    }

    /// Connect an element to a node. Order of connection defines the
    /// element's reference direction.
    pub fn connect(&mut self, elem: ElemId, node: NodeId) -> EngineResult<()> {
        let elem_domain = self.elements[elem.idx()].domain();
        let node_domain = self.nodes[node.idx()].domain();
        let compatible = elem_domain == node_domain
            || elem_domain == PhysicalDomain::Multidomain;
        if !compatible {
            return Err(EngineError::model(format!(
                "element '{}' ({elem_domain:?}) cannot connect to node '{}' ({node_domain:?})",
                self.elements[elem.idx()].name,
                self.nodes[node.idx()].name
            )));
        }
        let slot = self.nodes[node.idx()].register(elem);
        self.elements[elem.idx()].attach(Port { node, slot })
    }

    /// Connect a two-port element between `n0` (reference inlet) and `n1`.
    pub fn connect_between(&mut self, elem: ElemId, n0: NodeId, n1: NodeId) -> EngineResult<()> {
        self.connect(elem, n0)?;
        self.connect(elem, n1)
    }

    /// Connect `elem` to the node `other` sits on (attaching `other` first
    /// if it is not yet on that node).
    pub fn connect_via(&mut self, elem: ElemId, other: ElemId, node: NodeId) -> EngineResult<()> {
        let already = self.elements[other.idx()]
            .ports()
            .iter()
            .any(|p| p.node == node);
        if !already {
            self.connect(other, node)?;
        }
        self.connect(elem, node)
    }

    /// Declare two elements as coupled counterparts (symmetric back-links).
    pub fn couple(&mut self, a: ElemId, b: ElemId) -> EngineResult<()> {
        if a == b {
            return Err(EngineError::model("an element cannot couple to itself"));
        }
        self.elements[a.idx()].set_coupled(b);
        self.elements[b.idx()].set_coupled(a);
        Ok(())
    }

    /// Couple an extension-aware element to its thermal source counterpart
    /// and hand the handler the source's attachment for heat-flow readout.
    /// The source must already be connected.
    pub fn attach_thermal_source(&mut self, elem: ElemId, source: ElemId) -> EngineResult<()> {
        let source_port = *self.elements[source.idx()].ports().first().ok_or_else(|| {
            EngineError::model(format!(
                "thermal source '{}' must be connected before coupling",
                self.elements[source.idx()].name
            ))
        })?;
        let target = &mut self.elements[elem.idx()];
        match target.handler_mut() {
            Some(Handler::ThermalCoupled(h)) => h.set_thermal_port(source_port),
            Some(Handler::IsobaricIsochoric(h)) => h.set_thermal_port(source_port),
            Some(Handler::PhasedExpanding(h)) => h.set_thermal_port(source_port),
            _ => {
                return Err(EngineError::model(format!(
                    "element '{}' has no handler that takes a thermal source",
                    target.name
                )));
            }
        }
        self.couple(elem, source)
    }

    /// Pair two no-mass exchanger sides: each side receives the other's
    /// attachments; `a` becomes the computing primary.
    pub fn pair_exchangers(&mut self, a: ElemId, b: ElemId) -> EngineResult<()> {
        let ports_a = self.elements[a.idx()].ports().to_vec();
        let ports_b = self.elements[b.idx()].ports().to_vec();
        if ports_a.len() != 2 || ports_b.len() != 2 {
            return Err(EngineError::model(
                "exchanger sides must be connected to two nodes each before pairing",
            ));
        }
        let cp_b = match self.elements[b.idx()].handler() {
            Some(Handler::NoMassExchanger(h)) => h.cp_this,
            _ => {
                return Err(EngineError::model(format!(
                    "element '{}' is not a no-mass exchanger side",
                    self.elements[b.idx()].name
                )));
            }
        };
        match self.elements[a.idx()].handler_mut() {
            Some(Handler::NoMassExchanger(h)) => h.set_other_side(ports_b, cp_b),
            _ => {
                return Err(EngineError::model(format!(
                    "element '{}' is not a no-mass exchanger side",
                    self.elements[a.idx()].name
                )));
            }
        }
        self.couple(a, b)
    }

    /// Fixed step time, cascaded to every element and handler.
    pub fn set_step_time(&mut self, dt: Time) -> EngineResult<()> {
        let dt = dt.value;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(EngineError::model("step time must be positive"));
        }
        self.step_time = dt;
        for elem in &mut self.elements {
            elem.set_step_time(dt);
        }
        Ok(())
    }

    /// Validate and freeze the network.
    pub fn finish(self) -> EngineResult<Network> {
        // Every element must be attached.
        for elem in &self.elements {
            if elem.ports().is_empty() {
                return Err(EngineError::model(format!(
                    "element '{}' is not connected to any node",
                    elem.name
                )));
            }
        }

        // Coupling must resolve back symmetrically.
        for elem in &self.elements {
            if let Some(other) = elem.coupled() {
                let back = self.elements[other.idx()].coupled();
                if back != Some(elem.id) {
                    return Err(EngineError::model(format!(
                        "asymmetric coupling: '{}' links '{}' but not back",
                        elem.name, self.elements[other.idx()].name
                    )));
                }
            }
        }

        Ok(Network {
            nodes: self.nodes,
            elements: self.elements,
            table: self.table,
            step_time: self.step_time,
        })
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_elements::Dissipator;

    #[test]
    fn builder_rejects_invalid_category() {
        let mut b = ModelBuilder::new();
        let err = b
            .add_element(
                "coil",
                PhysicalDomain::Hydraulic,
                Kind::Inductance(bf_elements::Storage::new(1.0)),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Model { .. }));
    }

    #[test]
    fn builder_rejects_domain_mismatch() {
        let mut b = ModelBuilder::new();
        let n = b.add_node("wire", PhysicalDomain::Electrical);
        let r = b
            .add_element(
                "pipe",
                PhysicalDomain::Hydraulic,
                Kind::Dissipator(Dissipator::linear(1.0).unwrap()),
            )
            .unwrap();
        assert!(b.connect(r, n).is_err());
    }

    #[test]
    fn finish_rejects_unconnected_elements() {
        let mut b = ModelBuilder::new();
        b.add_element(
            "stray",
            PhysicalDomain::Hydraulic,
            Kind::Origin {
                effort: 0.0,
                accepts_external: true,
            },
        )
        .unwrap();
        assert!(b.finish().is_err());
    }

    #[test]
    fn coupling_is_symmetric_after_couple() {
        let mut b = ModelBuilder::new();
        let n = b.add_node("n", PhysicalDomain::Thermal);
        let a = b
            .add_element(
                "a",
                PhysicalDomain::Thermal,
                Kind::EffortSource { effort: 300.0 },
            )
            .unwrap();
        let c = b
            .add_element(
                "c",
                PhysicalDomain::Thermal,
                Kind::EffortSource { effort: 300.0 },
            )
            .unwrap();
        b.connect(a, n).unwrap();
        b.connect(c, n).unwrap();
        b.couple(a, c).unwrap();
        let net = b.finish().unwrap();
        assert_eq!(net.element(a).coupled(), Some(c));
        assert_eq!(net.element(c).coupled(), Some(a));
    }
}
