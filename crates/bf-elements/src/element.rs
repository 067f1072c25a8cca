//! Elements: the hyperedges of the network, with one step rule per
//! behavioral category.

use bf_core::{ElemId, EngineError, EngineResult, Real};
use bf_graph::{ElementCategory, Node, PhysicalDomain, Port};
use bf_handlers::{Handler, HandlerCtx};
use bf_steam::SteamTable;

use crate::converter::Converter;
use crate::dissipator::Dissipator;
use crate::storage::Storage;

/// Behavior payload of an element, one variant per category.
#[derive(Debug, Clone)]
pub enum Kind {
    /// No connection: every flow slot is forced to 0.
    Open,
    /// Effort equal on all incident nodes; flow passes through.
    Bridged,
    /// Effort/flow relation between exactly two nodes.
    Dissipator(Dissipator),
    /// Stores the integral of flow and imposes its state as effort.
    Capacitance(Storage),
    /// Stores the integral of effort and imposes its state as flow.
    Inductance(Storage),
    /// Imposes a configured flow through itself.
    FlowSource { flow: Real },
    /// Imposes a configured effort at the outlet, the reference 0 at the
    /// inlet; single-port variants impose the value on their only node.
    EffortSource { effort: Real },
    /// Imposes both effort and flow on its single node.
    Enforcer { effort: Real, flow: Real },
    /// Imposes effort on its single node; flow is free. The open variant
    /// accepts an externally imposed effort without conflict.
    Origin { effort: Real, accepts_external: bool },
    /// Two-port bridge between extensions.
    Converter(Converter),
}

impl Kind {
    pub fn category(&self) -> ElementCategory {
        match self {
            Kind::Open => ElementCategory::Open,
            Kind::Bridged | Kind::Converter(_) => ElementCategory::Bridged,
            Kind::Dissipator(_) => ElementCategory::Dissipator,
            Kind::Capacitance(_) => ElementCategory::Capacitance,
            Kind::Inductance(_) => ElementCategory::Inductance,
            Kind::FlowSource { .. } => ElementCategory::FlowSource,
            Kind::EffortSource { .. } => ElementCategory::EffortSource,
            Kind::Enforcer { .. } => ElementCategory::Enforcer,
            Kind::Origin { .. } => ElementCategory::Origin,
        }
    }
}

/// A network element: category payload, attachments, optional scalar
/// handler, optional coupled counterpart in another domain.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElemId,
    pub name: String,
    domain: PhysicalDomain,
    kind: Kind,
    ports: Vec<Port>,
    handler: Option<Handler>,
    coupled: Option<ElemId>,
}

impl Element {
    pub fn new(id: ElemId, name: impl Into<String>, domain: PhysicalDomain, kind: Kind) -> Self {
        Self {
            id,
            name: name.into(),
            domain,
            kind,
            ports: Vec::new(),
            handler: None,
            coupled: None,
        }
    }

    pub fn domain(&self) -> PhysicalDomain {
        self.domain
    }

    pub fn category(&self) -> ElementCategory {
        self.kind.category()
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut Kind {
        &mut self.kind
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Attach a node (already registered on the node side). Connection
    /// order defines the reference direction; over-connecting a category
    /// with a port limit is a model error.
    pub fn attach(&mut self, port: Port) -> EngineResult<()> {
        let limit = self.category().max_ports();
        if self.ports.len() >= limit {
            return Err(EngineError::model(format!(
                "element '{}' accepts at most {limit} node(s)",
                self.name
            )));
        }
        self.ports.push(port);
        Ok(())
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut Handler> {
        self.handler.as_mut()
    }

    /// Compose a scalar handler in; only extension-domain elements carry one.
    pub fn set_handler(&mut self, handler: Handler) -> EngineResult<()> {
        if self.domain.extension() == bf_graph::ExtensionKind::None {
            return Err(EngineError::model(format!(
                "element '{}' ({:?}) cannot carry a scalar handler",
                self.name, self.domain
            )));
        }
        self.handler = Some(handler);
        Ok(())
    }

    pub fn coupled(&self) -> Option<ElemId> {
        self.coupled
    }

    pub fn set_coupled(&mut self, other: ElemId) {
        self.coupled = Some(other);
    }

    /// Cascade the model step time into storage and handler.
    pub fn set_step_time(&mut self, dt: Real) {
        match &mut self.kind {
            Kind::Capacitance(st) | Kind::Inductance(st) => st.set_step_time(dt),
            _ => {}
        }
        if let Some(h) = &mut self.handler {
            h.set_step_time(dt);
        }
    }

    /// Per-cycle reset: commits prepared storage and handler state.
    pub fn prepare(&mut self) {
        match &mut self.kind {
            Kind::Capacitance(st) | Kind::Inductance(st) => st.prepare(),
            _ => {}
        }
        if let Some(h) = &mut self.handler {
            h.prepare();
        }
    }

    /// One fixed-point iteration: derive whatever the current node state
    /// allows, returning whether anything changed.
    pub fn step(&mut self, nodes: &mut [Node], table: &dyn SteamTable) -> EngineResult<bool> {
        let mut did = match &mut self.kind {
            Kind::Open => step_open(&self.ports, nodes)?,
            Kind::Bridged => step_bridged(&self.ports, nodes)?,
            Kind::Dissipator(law) => step_dissipator(&self.name, law, &self.ports, nodes)?,
            Kind::Capacitance(storage) => {
                step_capacitance(&self.name, storage, self.handler.as_ref(), &self.ports, nodes)?
            }
            Kind::Inductance(storage) => step_inductance(&self.name, storage, &self.ports, nodes)?,
            Kind::FlowSource { flow } => step_flow_source(*flow, &self.ports, nodes)?,
            Kind::EffortSource { effort } => step_effort_source(*effort, &self.ports, nodes)?,
            Kind::Enforcer { effort, flow } => {
                step_enforcer(&self.name, *effort, *flow, &self.ports, nodes)?
            }
            Kind::Origin {
                effort,
                accepts_external,
            } => step_origin(*effort, *accepts_external, &self.ports, nodes)?,
            Kind::Converter(conv) => conv.step(&self.name, &self.ports, nodes, table)?,
        };

        if let Some(handler) = &mut self.handler {
            let mut ctx = HandlerCtx {
                name: &self.name,
                ports: &self.ports,
                nodes,
                table,
            };
            did |= handler.do_calculation(&mut ctx)?;
        }
        Ok(did)
    }

    /// Whether the element has derived everything it is responsible for.
    pub fn is_finished(&self, nodes: &[Node]) -> bool {
        let core_done = match &self.kind {
            Kind::Open => self.all_flows_updated(nodes),
            Kind::Bridged => self.all_efforts_updated(nodes) && self.all_flows_updated(nodes),
            Kind::Dissipator(_) => {
                self.all_efforts_updated(nodes) && self.all_flows_updated(nodes)
            }
            Kind::Capacitance(st) => {
                self.all_efforts_updated(nodes) && self.all_flows_updated(nodes) && st.is_integrated()
            }
            Kind::Inductance(st) => {
                self.all_efforts_updated(nodes) && self.all_flows_updated(nodes) && st.is_integrated()
            }
            Kind::FlowSource { .. } => self.all_flows_updated(nodes),
            Kind::EffortSource { .. } => {
                self.all_efforts_updated(nodes) && self.all_flows_updated(nodes)
            }
            Kind::Enforcer { .. } => {
                self.all_efforts_updated(nodes) && self.all_flows_updated(nodes)
            }
            Kind::Origin { .. } => self.all_efforts_updated(nodes),
            Kind::Converter(conv) => conv.is_finished(&self.ports, nodes),
        };
        if !core_done {
            return false;
        }
        match &self.handler {
            None => true,
            Some(handler) => handler.is_finished(&self.ports, nodes),
        }
    }

    fn all_flows_updated(&self, nodes: &[Node]) -> bool {
        self.ports
            .iter()
            .all(|p| nodes[p.node.idx()].flow_is_updated(p.slot))
    }

    fn all_efforts_updated(&self, nodes: &[Node]) -> bool {
        self.ports
            .iter()
            .all(|p| nodes[p.node.idx()].effort_is_updated())
    }

    /// Element-side Kirchhoff: signed sum over the element's own slots,
    /// available once every port flow is derived.
    pub fn flow_residual(&self, nodes: &[Node]) -> EngineResult<Real> {
        let mut sum = 0.0;
        for p in &self.ports {
            sum += nodes[p.node.idx()].flow(p.slot)?;
        }
        Ok(sum)
    }
}

fn step_open(ports: &[Port], nodes: &mut [Node]) -> EngineResult<bool> {
    let mut did = false;
    for p in ports {
        let node = &mut nodes[p.node.idx()];
        if !node.flow_is_updated(p.slot) {
            did |= node.set_flow(p.slot, 0.0)?;
        }
    }
    Ok(did)
}

fn step_bridged(ports: &[Port], nodes: &mut [Node]) -> EngineResult<bool> {
    let mut did = false;

    // Any known effort crosses to every incident node.
    let known = ports
        .iter()
        .find(|p| nodes[p.node.idx()].effort_is_updated())
        .copied();
    if let Some(src) = known {
        let e = nodes[src.node.idx()].effort()?;
        for p in ports {
            if !nodes[p.node.idx()].effort_is_updated() {
                did |= nodes[p.node.idx()].set_effort(e)?;
            }
        }
    }

    // One missing flow follows from conservation across the element.
    let missing: Vec<usize> = (0..ports.len())
        .filter(|&i| !nodes[ports[i].node.idx()].flow_is_updated(ports[i].slot))
        .collect();
    if missing.len() == 1 {
        let mut sum = 0.0;
        for (i, p) in ports.iter().enumerate() {
            if i != missing[0] {
                sum += nodes[p.node.idx()].flow(p.slot)?;
            }
        }
        let p = ports[missing[0]];
        did |= nodes[p.node.idx()].set_flow(p.slot, -sum)?;
    }
    Ok(did)
}

fn step_dissipator(
    name: &str,
    law: &Dissipator,
    ports: &[Port],
    nodes: &mut [Node],
) -> EngineResult<bool> {
    if ports.len() != 2 {
        return Err(EngineError::model(format!(
            "dissipator '{name}' needs exactly two attachments"
        )));
    }
    let mut did = false;
    let (p0, p1) = (ports[0], ports[1]);
    let e0_known = nodes[p0.node.idx()].effort_is_updated();
    let e1_known = nodes[p1.node.idx()].effort_is_updated();

    if e0_known && e1_known {
        let e0 = nodes[p0.node.idx()].effort()?;
        let e1 = nodes[p1.node.idx()].effort()?;
        let q = law.flow_from_efforts(e0, e1)?;
        did |= nodes[p0.node.idx()].set_flow(p0.slot, q)?;
        did |= nodes[p1.node.idx()].set_flow(p1.slot, -q)?;
        return Ok(did);
    }

    // Causality inversion: a known flow and one known effort give the other
    // effort (linear law only).
    let f0_known = nodes[p0.node.idx()].flow_is_updated(p0.slot);
    let f1_known = nodes[p1.node.idx()].flow_is_updated(p1.slot);

    // Flow passes through regardless.
    if f0_known && !f1_known {
        let q = nodes[p0.node.idx()].flow(p0.slot)?;
        did |= nodes[p1.node.idx()].set_flow(p1.slot, -q)?;
    } else if f1_known && !f0_known {
        let q = nodes[p1.node.idx()].flow(p1.slot)?;
        did |= nodes[p0.node.idx()].set_flow(p0.slot, -q)?;
    }

    if e0_known && nodes[p0.node.idx()].flow_is_updated(p0.slot) {
        let e0 = nodes[p0.node.idx()].effort()?;
        let q0 = nodes[p0.node.idx()].flow(p0.slot)?;
        if let Some(e1) = law.effort_from_flow(e0, q0) {
            did |= nodes[p1.node.idx()].set_effort(e1)?;
        }
    } else if e1_known && nodes[p1.node.idx()].flow_is_updated(p1.slot) {
        let e1 = nodes[p1.node.idx()].effort()?;
        let q1 = nodes[p1.node.idx()].flow(p1.slot)?;
        if let Some(e0) = law.effort_from_flow(e1, q1) {
            did |= nodes[p0.node.idx()].set_effort(e0)?;
        }
    }
    Ok(did)
}

fn step_capacitance(
    name: &str,
    storage: &mut Storage,
    handler: Option<&Handler>,
    ports: &[Port],
    nodes: &mut [Node],
) -> EngineResult<bool> {
    let mut did = false;

    // Imposed effort: the handler's (reservoir pressure) where it owns it,
    // otherwise state plus offset. Fixed-volume handlers take their
    // pressure from the network instead and impose nothing.
    let suppressed = handler.map(|h| h.suppresses_effort()).unwrap_or(false);
    if !suppressed {
        let effort = handler
            .and_then(|h| h.imposed_effort())
            .unwrap_or(storage.state_value() + storage.effort_offset);
        for p in ports {
            if !nodes[p.node.idx()].effort_is_updated() {
                did |= nodes[p.node.idx()].set_effort(effort)?;
            }
        }
    }

    if storage.is_integrated() {
        return Ok(did);
    }
    let all_flows = ports
        .iter()
        .all(|p| nodes[p.node.idx()].flow_is_updated(p.slot));
    if !all_flows {
        return Ok(did);
    }
    let mut net_in = 0.0;
    for p in ports {
        net_in += nodes[p.node.idx()].flow(p.slot)?;
    }
    storage.integrate(name, net_in)?;
    Ok(true)
}

fn step_inductance(
    name: &str,
    storage: &mut Storage,
    ports: &[Port],
    nodes: &mut [Node],
) -> EngineResult<bool> {
    if ports.len() != 2 {
        return Err(EngineError::model(format!(
            "inductance '{name}' needs exactly two attachments"
        )));
    }
    let mut did = false;
    let q = storage.state_value();
    let (p0, p1) = (ports[0], ports[1]);
    if !nodes[p0.node.idx()].flow_is_updated(p0.slot) {
        did |= nodes[p0.node.idx()].set_flow(p0.slot, q)?;
    }
    if !nodes[p1.node.idx()].flow_is_updated(p1.slot) {
        did |= nodes[p1.node.idx()].set_flow(p1.slot, -q)?;
    }

    if !storage.is_integrated()
        && nodes[p0.node.idx()].effort_is_updated()
        && nodes[p1.node.idx()].effort_is_updated()
    {
        let e0 = nodes[p0.node.idx()].effort()?;
        let e1 = nodes[p1.node.idx()].effort()?;
        storage.integrate(name, e0 - e1)?;
        did = true;
    }
    Ok(did)
}

fn step_flow_source(flow: Real, ports: &[Port], nodes: &mut [Node]) -> EngineResult<bool> {
    let mut did = false;
    match ports {
        [only] => {
            if !nodes[only.node.idx()].flow_is_updated(only.slot) {
                did |= nodes[only.node.idx()].set_flow(only.slot, flow)?;
            }
        }
        [inlet, outlet] => {
            if !nodes[inlet.node.idx()].flow_is_updated(inlet.slot) {
                did |= nodes[inlet.node.idx()].set_flow(inlet.slot, flow)?;
            }
            if !nodes[outlet.node.idx()].flow_is_updated(outlet.slot) {
                did |= nodes[outlet.node.idx()].set_flow(outlet.slot, -flow)?;
            }
        }
        _ => {
            return Err(EngineError::model(
                "flow source accepts one or two attachments",
            ));
        }
    }
    Ok(did)
}

fn step_effort_source(effort: Real, ports: &[Port], nodes: &mut [Node]) -> EngineResult<bool> {
    let mut did = false;
    match ports {
        [only] => {
            if !nodes[only.node.idx()].effort_is_updated() {
                did |= nodes[only.node.idx()].set_effort(effort)?;
            }
        }
        [inlet, outlet] => {
            // Reference effort at the inlet, configured value at the outlet.
            if !nodes[inlet.node.idx()].effort_is_updated() {
                did |= nodes[inlet.node.idx()].set_effort(0.0)?;
            }
            if !nodes[outlet.node.idx()].effort_is_updated() {
                did |= nodes[outlet.node.idx()].set_effort(effort)?;
            }
            // Flow passes through.
            let f0 = nodes[inlet.node.idx()].flow_is_updated(inlet.slot);
            let f1 = nodes[outlet.node.idx()].flow_is_updated(outlet.slot);
            if f0 && !f1 {
                let q = nodes[inlet.node.idx()].flow(inlet.slot)?;
                did |= nodes[outlet.node.idx()].set_flow(outlet.slot, -q)?;
            } else if f1 && !f0 {
                let q = nodes[outlet.node.idx()].flow(outlet.slot)?;
                did |= nodes[inlet.node.idx()].set_flow(inlet.slot, -q)?;
            }
        }
        _ => {
            return Err(EngineError::model(
                "effort source accepts one or two attachments",
            ));
        }
    }
    Ok(did)
}

fn step_enforcer(
    name: &str,
    effort: Real,
    flow: Real,
    ports: &[Port],
    nodes: &mut [Node],
) -> EngineResult<bool> {
    let [only] = ports else {
        return Err(EngineError::model(format!(
            "enforcer '{name}' takes exactly one attachment"
        )));
    };
    let mut did = false;
    let node = &mut nodes[only.node.idx()];
    if !node.effort_is_updated() {
        did |= node.set_effort(effort)?;
    }
    if !node.flow_is_updated(only.slot) {
        did |= node.set_flow(only.slot, flow)?;
    }
    Ok(did)
}

fn step_origin(
    effort: Real,
    accepts_external: bool,
    ports: &[Port],
    nodes: &mut [Node],
) -> EngineResult<bool> {
    let [only] = ports else {
        return Err(EngineError::model("origin takes exactly one attachment"));
    };
    let node = &mut nodes[only.node.idx()];
    if node.effort_is_updated() {
        if accepts_external {
            // Open origin: whatever the network imposed stands.
            return Ok(false);
        }
        // Strict origin re-derives; a differing value is a conflict.
        return node.set_effort(effort);
    }
    node.set_effort(effort)
}
