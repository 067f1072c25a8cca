//! Network nodes: effort, per-element flow slots, extension containers, and
//! the distribution rules a node applies to them.

use bf_core::{ElemId, EngineError, EngineResult, NodeId, RESIDUAL_FLOW, Real, Tolerances};
use bf_steam::SteamTable;

use crate::domain::{ExtensionKind, PhysicalDomain};
use crate::slot::{FlowSlot, ScalarSlot, SteamProps, SteamSlot};

/// One element-node attachment: the node and the slot index the element was
/// assigned on it. Connection order defines the reference direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub node: NodeId,
    pub slot: usize,
}

/// The scalar-extension container of a node, keyed per connected element.
#[derive(Debug, Clone)]
pub enum NodeExtension {
    None,
    /// Heat-fluid node: per-element temperature slots [K].
    Heat {
        temps: Vec<ScalarSlot>,
        avg_out_temperature: Option<Real>,
    },
    /// Phased-fluid node: per-element heat-energy slots [J/kg].
    Phased { energies: Vec<ScalarSlot> },
    /// Steam node: per-element steam-state slots.
    Steam { states: Vec<SteamSlot> },
}

impl NodeExtension {
    fn for_domain(domain: PhysicalDomain) -> Self {
        match domain.extension() {
            ExtensionKind::None => NodeExtension::None,
            ExtensionKind::Temperature => NodeExtension::Heat {
                temps: Vec::new(),
                avg_out_temperature: None,
            },
            ExtensionKind::HeatEnergy => NodeExtension::Phased {
                energies: Vec::new(),
            },
            ExtensionKind::Steam => NodeExtension::Steam { states: Vec::new() },
        }
    }
}

/// A node in the network.
///
/// Holds one effort scalar and, for each connected element, a flow slot
/// (plus a scalar/steam slot when the domain carries an extension). Slots
/// are addressed by the index returned from [`Node::register`]; elements
/// remember their slot index per port, never pointer identity.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    domain: PhysicalDomain,
    effort: Real,
    effort_updated: bool,
    flows: Vec<FlowSlot>,
    /// Owning element per slot, for diagnostics.
    owners: Vec<ElemId>,
    ext: NodeExtension,
    tol: Tolerances,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, domain: PhysicalDomain) -> Self {
        Self {
            id,
            name: name.into(),
            domain,
            effort: 0.0,
            effort_updated: false,
            flows: Vec::new(),
            owners: Vec::new(),
            ext: NodeExtension::for_domain(domain),
            tol: Tolerances::default(),
        }
    }

    pub fn domain(&self) -> PhysicalDomain {
        self.domain
    }

    pub fn extension_kind(&self) -> ExtensionKind {
        self.domain.extension()
    }

    /// Register a connecting element; returns the slot index the element
    /// must use to address its flow (and scalar) on this node.
    pub fn register(&mut self, owner: ElemId) -> usize {
        let slot = self.flows.len();
        self.flows.push(FlowSlot::new());
        self.owners.push(owner);
        match &mut self.ext {
            NodeExtension::None => {}
            NodeExtension::Heat { temps, .. } => temps.push(ScalarSlot::new()),
            NodeExtension::Phased { energies } => energies.push(ScalarSlot::new()),
            NodeExtension::Steam { states } => states.push(SteamSlot::new()),
        }
        slot
    }

    /// Per-cycle reset: clears every updated mark, keeps no state.
    pub fn prepare(&mut self) {
        self.effort_updated = false;
        for f in &mut self.flows {
            f.prepare();
        }
        match &mut self.ext {
            NodeExtension::None => {}
            NodeExtension::Heat {
                temps,
                avg_out_temperature,
            } => {
                for t in temps {
                    t.prepare();
                }
                *avg_out_temperature = None;
            }
            NodeExtension::Phased { energies } => {
                for e in energies {
                    e.prepare();
                }
            }
            NodeExtension::Steam { states } => {
                for s in states {
                    s.prepare();
                }
            }
        }
    }

    // ---- effort ----

    pub fn effort_is_updated(&self) -> bool {
        self.effort_updated
    }

    pub fn effort(&self) -> EngineResult<Real> {
        if !self.effort_updated {
            return Err(EngineError::calculation(format!(
                "effort of node '{}' read before it was updated",
                self.name
            )));
        }
        Ok(self.effort)
    }

    /// Derive the node effort. Conflicting derivations are a Calculation
    /// error; equal re-derivations are a no-op.
    pub fn set_effort(&mut self, value: Real) -> EngineResult<bool> {
        if !value.is_finite() {
            return Err(EngineError::calculation(format!(
                "derived a non-finite effort on node '{}'",
                self.name
            )));
        }
        if self.effort_updated {
            if bf_core::nearly_equal(self.effort, value, self.tol) {
                return Ok(false);
            }
            return Err(EngineError::calculation(format!(
                "conflicting effort derivations on node '{}': {} vs {}",
                self.name, self.effort, value
            )));
        }
        self.effort = value;
        self.effort_updated = true;
        Ok(true)
    }

    // ---- flows ----

    pub fn slot_count(&self) -> usize {
        self.flows.len()
    }

    pub fn slot_owner(&self, slot: usize) -> ElemId {
        self.owners[slot]
    }

    pub fn flow_is_updated(&self, slot: usize) -> bool {
        self.flows[slot].is_updated()
    }

    pub fn flow(&self, slot: usize) -> EngineResult<Real> {
        self.flows[slot].value()
    }

    pub fn set_flow(&mut self, slot: usize, value: Real) -> EngineResult<bool> {
        self.flows[slot].set(value, self.tol)
    }

    pub fn flows_all_updated(&self) -> bool {
        self.flows.iter().all(|f| f.is_updated())
    }

    /// Count of slots still awaiting a flow derivation.
    pub fn unupdated_flow_count(&self) -> usize {
        self.flows.iter().filter(|f| !f.is_updated()).count()
    }

    /// Kirchhoff completion: when all but one flow slot are updated, the
    /// missing one is minus the sum of the rest. A node with a single slot
    /// is a dead end and its flow is 0.
    pub fn complete_missing_flow(&mut self) -> EngineResult<bool> {
        let missing: Vec<usize> = (0..self.flows.len())
            .filter(|&i| !self.flows[i].is_updated())
            .collect();
        if missing.len() != 1 {
            return Ok(false);
        }
        let mut sum = 0.0;
        for (i, f) in self.flows.iter().enumerate() {
            if i != missing[0] {
                sum += f.value()?;
            }
        }
        self.set_flow(missing[0], -sum)
    }

    /// Signed sum over all slots, available once every flow is updated.
    pub fn flow_residual(&self) -> EngineResult<Real> {
        let mut sum = 0.0;
        for f in &self.flows {
            sum += f.value()?;
        }
        Ok(sum)
    }

    // ---- scalar extension (temperature / heat-energy) ----

    fn scalar_slots(&self) -> Option<&Vec<ScalarSlot>> {
        match &self.ext {
            NodeExtension::Heat { temps, .. } => Some(temps),
            NodeExtension::Phased { energies } => Some(energies),
            _ => None,
        }
    }

    fn scalar_slots_mut(&mut self) -> Option<&mut Vec<ScalarSlot>> {
        match &mut self.ext {
            NodeExtension::Heat { temps, .. } => Some(temps),
            NodeExtension::Phased { energies } => Some(energies),
            _ => None,
        }
    }

    pub fn scalar_slot(&self, slot: usize) -> EngineResult<&ScalarSlot> {
        self.scalar_slots()
            .map(|s| &s[slot])
            .ok_or_else(|| self.wrong_extension("scalar"))
    }

    pub fn scalar_slot_mut(&mut self, slot: usize) -> EngineResult<&mut ScalarSlot> {
        let err = self.wrong_extension("scalar");
        self.scalar_slots_mut()
            .map(|s| &mut s[slot])
            .ok_or(err)
    }

    pub fn steam_slot(&self, slot: usize) -> EngineResult<&SteamSlot> {
        match &self.ext {
            NodeExtension::Steam { states } => Ok(&states[slot]),
            _ => Err(self.wrong_extension("steam")),
        }
    }

    pub fn steam_slot_mut(&mut self, slot: usize) -> EngineResult<&mut SteamSlot> {
        let err = self.wrong_extension("steam");
        match &mut self.ext {
            NodeExtension::Steam { states } => Ok(&mut states[slot]),
            _ => Err(err),
        }
    }

    fn wrong_extension(&self, wanted: &str) -> EngineError {
        EngineError::model(format!(
            "node '{}' ({:?}) does not carry a {wanted} extension",
            self.name, self.domain
        ))
    }

    /// Cached mean temperature assigned to outgoing slots by the last mixing
    /// pass (heat nodes only).
    pub fn avg_out_temperature(&self) -> Option<Real> {
        match &self.ext {
            NodeExtension::Heat {
                avg_out_temperature,
                ..
            } => *avg_out_temperature,
            _ => None,
        }
    }

    /// True when every extension slot (scalar or steam) is updated.
    pub fn extension_all_updated(&self) -> bool {
        match &self.ext {
            NodeExtension::None => true,
            NodeExtension::Heat { temps, .. } => temps.iter().all(|t| t.is_updated()),
            NodeExtension::Phased { energies } => energies.iter().all(|e| e.is_updated()),
            NodeExtension::Steam { states } => states.iter().all(|s| s.is_updated()),
        }
    }

    /// Scalar mixing rule for heat and phased nodes.
    ///
    /// Once every flow slot is updated: all-residual flow marks every open
    /// slot `no_value`; otherwise the mass-weighted mean of the incoming
    /// scalars is assigned to every open outgoing slot. Incoming slots that
    /// are themselves `no_value` (residual streams) are skipped. Returns
    /// whether any slot transitioned; waits (returns false) while an
    /// incoming scalar is still underived.
    pub fn distribute_scalar(&mut self) -> EngineResult<bool> {
        if self.scalar_slots().is_none() {
            return Ok(false);
        }
        if !self.flows_all_updated() {
            return Ok(false);
        }
        if self.extension_all_updated() {
            return Ok(false);
        }
        let flows: Vec<Real> = self
            .flows
            .iter()
            .map(|f| f.value())
            .collect::<EngineResult<_>>()?;

        // Zero-flow degeneracy: nothing moves, nothing carries a scalar.
        if flows.iter().all(|v| v.abs() <= RESIDUAL_FLOW) {
            let slots = self.scalar_slots_mut().expect("checked above");
            let mut did = false;
            for s in slots.iter_mut() {
                if !s.is_updated() {
                    did |= s.set_no_value()?;
                }
            }
            return Ok(did);
        }

        // Streams entering the node have negative slot values (node -> element
        // is positive). Their scalars must all be known before mixing.
        let mut m_sum = 0.0;
        let mut mx_sum = 0.0;
        {
            let slots = self.scalar_slots().expect("checked above");
            for (i, &v) in flows.iter().enumerate() {
                if v < -RESIDUAL_FLOW {
                    let slot = &slots[i];
                    if !slot.is_updated() {
                        return Ok(false);
                    }
                    if slot.is_no_value() {
                        continue;
                    }
                    let m_in = -v;
                    m_sum += m_in;
                    mx_sum += m_in * slot.value()?;
                }
            }
        }

        let mixed = if m_sum > 0.0 { Some(mx_sum / m_sum) } else { None };
        let tol = self.tol;
        let slots = self.scalar_slots_mut().expect("checked above");
        let mut did = false;
        for (i, &v) in flows.iter().enumerate() {
            let slot = &mut slots[i];
            if slot.is_updated() {
                continue;
            }
            if v > RESIDUAL_FLOW {
                match mixed {
                    Some(t) => did |= slot.set(t, tol)?,
                    None => did |= slot.set_no_value()?,
                }
            } else {
                // Residual slot on an otherwise live node.
                did |= slot.set_no_value()?;
            }
        }
        if let NodeExtension::Heat {
            avg_out_temperature,
            ..
        } = &mut self.ext
        {
            *avg_out_temperature = mixed;
        }
        Ok(did)
    }

    /// Steam distribution rule.
    ///
    /// A single incoming stream passes its 4-tuple through; several incoming
    /// streams average `h` mass-weighted and re-derive `T`, `s`, `x` via the
    /// table at the node pressure.
    pub fn distribute_steam(&mut self, table: &dyn SteamTable) -> EngineResult<bool> {
        if !matches!(self.ext, NodeExtension::Steam { .. }) {
            return Ok(false);
        }
        if !self.flows_all_updated() {
            return Ok(false);
        }
        if self.extension_all_updated() {
            return Ok(false);
        }
        let flows: Vec<Real> = self
            .flows
            .iter()
            .map(|f| f.value())
            .collect::<EngineResult<_>>()?;

        if flows.iter().all(|v| v.abs() <= RESIDUAL_FLOW) {
            if let NodeExtension::Steam { states } = &mut self.ext {
                let mut did = false;
                for s in states.iter_mut() {
                    if !s.is_updated() {
                        did |= s.set_no_value()?;
                    }
                }
                return Ok(did);
            }
            unreachable!();
        }

        // Collect incoming states; wait until all are derived.
        let mut incoming: Vec<(Real, SteamProps)> = Vec::new();
        if let NodeExtension::Steam { states } = &self.ext {
            for (i, &v) in flows.iter().enumerate() {
                if v < -RESIDUAL_FLOW {
                    let slot = &states[i];
                    if !slot.is_updated() {
                        return Ok(false);
                    }
                    if slot.is_no_value() {
                        continue;
                    }
                    incoming.push((-v, slot.props()?));
                }
            }
        }

        let mixed = match incoming.len() {
            0 => None,
            1 => Some(incoming[0].1),
            _ => {
                // Mixing several steam streams needs the node pressure.
                if !self.effort_is_updated() {
                    return Ok(false);
                }
                let p = self.effort()?;
                let m_sum: Real = incoming.iter().map(|(m, _)| m).sum();
                let h_mix: Real =
                    incoming.iter().map(|(m, s)| m * s.h).sum::<Real>() / m_sum;
                Some(SteamProps::new(
                    table.t_ph(p, h_mix)?,
                    h_mix,
                    table.s_ph(p, h_mix)?,
                    table.x_ph(p, h_mix)?,
                ))
            }
        };

        let tol = self.tol;
        if let NodeExtension::Steam { states } = &mut self.ext {
            let mut did = false;
            for (i, &v) in flows.iter().enumerate() {
                let slot = &mut states[i];
                if slot.is_updated() {
                    continue;
                }
                if v > RESIDUAL_FLOW {
                    match mixed {
                        Some(props) => did |= slot.set(props, tol)?,
                        None => did |= slot.set_no_value()?,
                    }
                } else {
                    did |= slot.set_no_value()?;
                }
            }
            return Ok(did);
        }
        unreachable!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::Id;
    use bf_steam::CurveFitTable;

    fn heat_node() -> Node {
        Node::new(Id::from_index(0), "n", PhysicalDomain::HeatFluid)
    }

    #[test]
    fn register_grows_slots() {
        let mut n = heat_node();
        let a = n.register(Id::from_index(0));
        let b = n.register(Id::from_index(1));
        assert_eq!((a, b), (0, 1));
        assert_eq!(n.slot_count(), 2);
        assert!(n.scalar_slot(0).is_ok());
        assert!(n.steam_slot(0).is_err());
    }

    #[test]
    fn effort_conflict_detection() {
        let mut n = heat_node();
        assert!(n.set_effort(1e5).unwrap());
        assert!(!n.set_effort(1e5).unwrap());
        assert!(n.set_effort(2e5).is_err());
    }

    #[test]
    fn kirchhoff_completion() {
        let mut n = heat_node();
        for i in 0..3 {
            n.register(Id::from_index(i));
        }
        n.set_flow(0, 2.0).unwrap();
        n.set_flow(1, 3.0).unwrap();
        assert!(n.complete_missing_flow().unwrap());
        assert_eq!(n.flow(2).unwrap(), -5.0);
        assert_eq!(n.flow_residual().unwrap(), 0.0);
    }

    #[test]
    fn completion_waits_for_two_missing() {
        let mut n = heat_node();
        for i in 0..3 {
            n.register(Id::from_index(i));
        }
        n.set_flow(0, 2.0).unwrap();
        assert!(!n.complete_missing_flow().unwrap());
    }

    #[test]
    fn single_slot_node_is_a_dead_end() {
        let mut n = heat_node();
        n.register(Id::from_index(0));
        assert!(n.complete_missing_flow().unwrap());
        assert_eq!(n.flow(0).unwrap(), 0.0);
    }

    #[test]
    fn scalar_mixing_mass_weighted() {
        let mut n = heat_node();
        for i in 0..3 {
            n.register(Id::from_index(i));
        }
        // Two streams into the node (negative), one out (positive).
        n.set_flow(0, -2.0).unwrap();
        n.set_flow(1, -1.0).unwrap();
        n.set_flow(2, 3.0).unwrap();
        n.scalar_slot_mut(0).unwrap().set(300.0, Tolerances::default()).unwrap();
        n.scalar_slot_mut(1).unwrap().set(360.0, Tolerances::default()).unwrap();

        assert!(n.distribute_scalar().unwrap());
        // (2*300 + 1*360) / 3 = 320
        assert_eq!(n.scalar_slot(2).unwrap().value().unwrap(), 320.0);
        assert_eq!(n.avg_out_temperature(), Some(320.0));
    }

    #[test]
    fn scalar_mixing_waits_for_incoming() {
        let mut n = heat_node();
        for i in 0..2 {
            n.register(Id::from_index(i));
        }
        n.set_flow(0, -2.0).unwrap();
        n.set_flow(1, 2.0).unwrap();
        // Incoming temperature not yet derived: no progress, no error.
        assert!(!n.distribute_scalar().unwrap());
    }

    #[test]
    fn zero_flow_marks_no_value_everywhere() {
        let mut n = heat_node();
        for i in 0..2 {
            n.register(Id::from_index(i));
        }
        n.set_flow(0, 0.0).unwrap();
        n.set_flow(1, 0.0).unwrap();
        assert!(n.distribute_scalar().unwrap());
        assert!(n.scalar_slot(0).unwrap().is_no_value());
        assert!(n.scalar_slot(1).unwrap().is_no_value());
    }

    #[test]
    fn steam_single_stream_passes_through() {
        let mut n = Node::new(Id::from_index(0), "s", PhysicalDomain::Steam);
        for i in 0..2 {
            n.register(Id::from_index(i));
        }
        n.set_flow(0, -1.0).unwrap();
        n.set_flow(1, 1.0).unwrap();
        let props = SteamProps::new(400.0, 2.7e6, 7000.0, 1.0);
        n.steam_slot_mut(0).unwrap().set(props, Tolerances::default()).unwrap();

        let table = CurveFitTable::new();
        assert!(n.distribute_steam(&table).unwrap());
        assert_eq!(n.steam_slot(1).unwrap().props().unwrap(), props);
    }

    #[test]
    fn steam_mixing_uses_table() {
        let mut n = Node::new(Id::from_index(0), "s", PhysicalDomain::Steam);
        for i in 0..3 {
            n.register(Id::from_index(i));
        }
        n.set_effort(1e5).unwrap();
        n.set_flow(0, -1.0).unwrap();
        n.set_flow(1, -1.0).unwrap();
        n.set_flow(2, 2.0).unwrap();
        let table = CurveFitTable::new();
        let h_liq = table.h_liq_p(1e5).unwrap();
        let a = SteamProps::new(350.0, h_liq - 1e5, 900.0, 0.0);
        let b = SteamProps::new(372.0, h_liq + 1e5, 1300.0, 0.1);
        n.steam_slot_mut(0).unwrap().set(a, Tolerances::default()).unwrap();
        n.steam_slot_mut(1).unwrap().set(b, Tolerances::default()).unwrap();

        assert!(n.distribute_steam(&table).unwrap());
        let out = n.steam_slot(2).unwrap().props().unwrap();
        assert_eq!(out.h, h_liq);
    }
}
