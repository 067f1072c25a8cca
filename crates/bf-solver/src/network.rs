//! The assembled network: arena of nodes and elements plus the shared
//! property oracle.

use std::sync::Arc;

use bf_core::{ElemId, EngineError, EngineResult, NodeId, Real};
use bf_elements::{Element, Kind};
use bf_graph::{ExtensionKind, Node};
use bf_steam::SteamTable;

/// Arena-backed network. Nodes and elements address each other exclusively
/// through ids and slot indices; the steam table is shared read-only.
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) elements: Vec<Element>,
    pub(crate) table: Arc<dyn SteamTable>,
    pub(crate) step_time: Real,
}

impl Network {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }

    pub fn element(&self, id: ElemId) -> &Element {
        &self.elements[id.idx()]
    }

    pub fn element_mut(&mut self, id: ElemId) -> &mut Element {
        &mut self.elements[id.idx()]
    }

    pub fn step_time(&self) -> Real {
        self.step_time
    }

    pub fn table(&self) -> &dyn SteamTable {
        self.table.as_ref()
    }

    /// Run one element's step rule against the node arena.
    pub(crate) fn step_element(&mut self, id: ElemId) -> EngineResult<bool> {
        let Self {
            nodes,
            elements,
            table,
            ..
        } = self;
        elements[id.idx()].step(nodes, table.as_ref())
    }

    /// Run one node's distribution rules (Kirchhoff completion and scalar /
    /// steam mixing).
    pub(crate) fn distribute_node(&mut self, id: NodeId) -> EngineResult<bool> {
        let Self { nodes, table, .. } = self;
        let node = &mut nodes[id.idx()];
        let mut did = node.complete_missing_flow()?;
        did |= match node.extension_kind() {
            ExtensionKind::None => false,
            ExtensionKind::Temperature | ExtensionKind::HeatEnergy => node.distribute_scalar()?,
            ExtensionKind::Steam => node.distribute_steam(table.as_ref())?,
        };
        Ok(did)
    }

    /// Push each thermal-coupled handler's committed scalar into its coupled
    /// effort source. Runs inside `prepare`, after handler state commits.
    pub(crate) fn propagate_coupling(&mut self) -> EngineResult<()> {
        let updates: Vec<(ElemId, Real)> = self
            .elements
            .iter()
            .filter_map(|e| {
                let target = e.coupled()?;
                let value = e.handler()?.coupling_effort()?;
                Some((target, value))
            })
            .collect();
        for (target, value) in updates {
            let elem = &mut self.elements[target.idx()];
            match elem.kind_mut() {
                Kind::EffortSource { effort } => *effort = value,
                _ => {
                    return Err(EngineError::model(format!(
                        "coupled element '{}' is not an effort source",
                        elem.name
                    )));
                }
            }
        }
        Ok(())
    }
}
