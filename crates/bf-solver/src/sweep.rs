//! The fixed-point iterator.

use std::collections::HashSet;

use bf_core::{ElemId, EngineError, EngineResult, NodeId};
use tracing::{debug, trace, warn};

use crate::network::Network;

/// Hard cap on sweeps per step, scaled by the number of elements.
const SWEEP_CAP_FACTOR: usize = 16;

/// Fixed-point sweep driver over a discovered subgraph.
///
/// The solver owns the list of elements and nodes it iterates; the network
/// arena owns the data. Iteration order within a sweep is unspecified and
/// not part of the contract — correctness rests on the monotonic growth of
/// the updated bits and commutativity of independent derivations.
#[derive(Debug, Default)]
pub struct Solver {
    elements: Vec<ElemId>,
    nodes: Vec<NodeId>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[ElemId] {
        &self.elements
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Discover the subgraph reachable from `start` and register it.
    /// May be called several times to cover disjoint networks (e.g. a
    /// thermal side wired to a fluid side only through coupling).
    pub fn add_network(&mut self, net: &Network, start: NodeId) {
        let mut seen_nodes: HashSet<NodeId> = self.nodes.iter().copied().collect();
        let mut seen_elems: HashSet<ElemId> = self.elements.iter().copied().collect();
        let mut queue = vec![start];

        while let Some(node_id) = queue.pop() {
            if !seen_nodes.insert(node_id) {
                continue;
            }
            self.nodes.push(node_id);
            let node = net.node(node_id);
            for slot in 0..node.slot_count() {
                let elem_id = node.slot_owner(slot);
                if seen_elems.insert(elem_id) {
                    self.elements.push(elem_id);
                    for port in net.element(elem_id).ports() {
                        if !seen_nodes.contains(&port.node) {
                            queue.push(port.node);
                        }
                    }
                }
            }
        }
        debug!(
            elements = self.elements.len(),
            nodes = self.nodes.len(),
            "network discovered"
        );
    }

    /// Per-cycle reset: every registered element and reachable node, then
    /// the coupling propagation (committed handler scalars into their
    /// coupled effort sources).
    pub fn prepare(&mut self, net: &mut Network) -> EngineResult<()> {
        for &e in &self.elements {
            net.element_mut(e).prepare();
        }
        for &n in &self.nodes {
            net.nodes[n.idx()].prepare();
        }
        net.propagate_coupling()
    }

    /// Advance one timestep: sweep to the fixed point, then require global
    /// completion. Storage next-states written during the sweep are
    /// committed by the next `prepare`.
    pub fn step_once(&mut self, net: &mut Network) -> EngineResult<()> {
        let cap = self.elements.len().max(1) * SWEEP_CAP_FACTOR;
        let mut sweeps = 0usize;

        loop {
            let mut changed = false;
            for &e in &self.elements {
                changed |= net.step_element(e)?;
            }
            for &n in &self.nodes {
                changed |= net.distribute_node(n)?;
            }
            sweeps += 1;
            trace!(sweeps, changed, "sweep complete");

            if !changed {
                break;
            }
            if sweeps > cap {
                let stuck = self.unupdated_nodes(net);
                warn!(sweeps, ?stuck, "sweep cap exceeded");
                return Err(EngineError::calculation(format!(
                    "no fixed point within {cap} sweeps; nodes with open slots: {}",
                    stuck.join(", ")
                )));
            }
        }

        let unfinished: Vec<&str> = self
            .elements
            .iter()
            .map(|&e| net.element(e))
            .filter(|elem| !elem.is_finished(net.nodes()))
            .map(|elem| elem.name.as_str())
            .collect();
        if !unfinished.is_empty() {
            return Err(EngineError::calculation(format!(
                "network is under-constrained; unfinished elements: {}",
                unfinished.join(", ")
            )));
        }
        debug!(sweeps, "step converged");
        Ok(())
    }

    fn unupdated_nodes(&self, net: &Network) -> Vec<String> {
        self.nodes
            .iter()
            .map(|&n| net.node(n))
            .filter(|node| node.unupdated_flow_count() > 0 || !node.effort_is_updated())
            .map(|node| node.name.clone())
            .collect()
    }
}
