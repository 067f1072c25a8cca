//! Paired no-mass exchanger handlers.
//!
//! Both variants couple two flow paths without holding mass. The pair is
//! wired at assembly: the primary side receives a copy of the peer's ports
//! (`set_other_side`) and performs the whole computation in one invocation,
//! writing both sides' outlet slots; the secondary side only reports
//! completion once its slots are written.

use bf_core::{EngineError, EngineResult, RESIDUAL_FLOW, Real, Tolerances};
use bf_graph::{Node, Port};

use crate::ctx::HandlerCtx;
use crate::scalar::ScalarKind;

/// Guard for the effectiveness formula's removable singularity.
const C_REL_UNITY_GUARD: Real = 1e-40;

/// Which half of an exchanger pair this handler is.
#[derive(Debug, Clone)]
pub enum ExchangerRole {
    /// Performs the computation; holds the peer's attachments.
    Primary { peer_ports: Vec<Port> },
    /// Written by the primary.
    Secondary,
}

/// Resolution of one exchanger side from its two port flows.
#[derive(Debug, Clone, Copy)]
enum SideFlow {
    /// A port flow is still underived.
    Waiting,
    /// Both flows are numerical residuals.
    Zero,
    /// Through-flow with inlet/outlet port indices.
    Flowing { m: Real, inlet: usize, outlet: usize },
}

fn resolve_side(nodes: &[Node], ports: &[Port]) -> EngineResult<SideFlow> {
    let mut inlet = None;
    let mut outlet = None;
    let mut m = 0.0;
    for (i, p) in ports.iter().enumerate() {
        let node = &nodes[p.node.idx()];
        if !node.flow_is_updated(p.slot) {
            return Ok(SideFlow::Waiting);
        }
        let v = node.flow(p.slot)?;
        if v > RESIDUAL_FLOW {
            inlet = Some(i);
            m = v;
        } else if v < -RESIDUAL_FLOW {
            outlet = Some(i);
        }
    }
    match (inlet, outlet) {
        (Some(inlet), Some(outlet)) => Ok(SideFlow::Flowing { m, inlet, outlet }),
        (None, None) => Ok(SideFlow::Zero),
        // One live and one residual port would leak mass through the side.
        _ => Err(EngineError::calculation(
            "exchanger side with unbalanced port flows",
        )),
    }
}

/// Inlet scalar of a side, if already derived. `Ok(None)` means wait.
fn inlet_scalar(nodes: &[Node], port: Port) -> EngineResult<Option<Real>> {
    let slot = nodes[port.node.idx()].scalar_slot(port.slot)?;
    if !slot.is_updated() {
        return Ok(None);
    }
    if slot.is_no_value() {
        return Err(EngineError::calculation(
            "exchanger inlet stream carries no scalar",
        ));
    }
    Ok(Some(slot.value()?))
}

fn write_scalar(nodes: &mut [Node], port: Port, value: Real) -> EngineResult<bool> {
    nodes[port.node.idx()]
        .scalar_slot_mut(port.slot)?
        .set(value, Tolerances::default())
}

fn mark_no_value(nodes: &mut [Node], port: Port) -> EngineResult<bool> {
    let slot = nodes[port.node.idx()].scalar_slot_mut(port.slot)?;
    if slot.is_updated() {
        return Ok(false);
    }
    slot.set_no_value()
}

/// NTU/ε counterflow heat exchanger without mass.
///
/// ```text
/// C_rel = C_min / C_max
/// ε     = ntu/(1+ntu)                                  if C_rel ≈ 1
///       = (1−e^(−ntu(1−C_rel))) / (1−C_rel·e^(−ntu(1−C_rel)))   otherwise
/// Q̇     = ε · C_min · (T_in_this − T_in_other)
/// ```
#[derive(Debug, Clone)]
pub struct NoMassExchanger {
    pub cp_this: Real,
    pub cp_other: Real,
    pub ntu: Real,
    role: ExchangerRole,
    done: bool,
}

impl NoMassExchanger {
    pub fn new(cp_this: Real, ntu: Real) -> Self {
        Self {
            cp_this,
            cp_other: cp_this,
            ntu,
            role: ExchangerRole::Secondary,
            done: false,
        }
    }

    /// Wire the peer side in; makes this side the computing primary.
    pub fn set_other_side(&mut self, peer_ports: Vec<Port>, cp_other: Real) {
        self.cp_other = cp_other;
        self.role = ExchangerRole::Primary { peer_ports };
    }

    pub fn prepare(&mut self) {
        self.done = false;
    }

    fn effectiveness(&self, c_rel: Real) -> Real {
        if (c_rel - 1.0).abs() < C_REL_UNITY_GUARD {
            self.ntu / (1.0 + self.ntu)
        } else {
            let e = (-self.ntu * (1.0 - c_rel)).exp();
            (1.0 - e) / (1.0 - c_rel * e)
        }
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        let peer_ports = match &self.role {
            ExchangerRole::Primary { peer_ports } => peer_ports.clone(),
            ExchangerRole::Secondary => return Ok(false),
        };
        if self.done {
            return Ok(false);
        }

        let this_side = resolve_side(ctx.nodes, ctx.ports)?;
        let other_side = resolve_side(ctx.nodes, &peer_ports)?;

        match (this_side, other_side) {
            (SideFlow::Waiting, _) | (_, SideFlow::Waiting) => Ok(false),

            (SideFlow::Zero, SideFlow::Zero) => {
                let mut did = false;
                for &p in ctx.ports.iter().chain(peer_ports.iter()) {
                    did |= mark_no_value(ctx.nodes, p)?;
                }
                self.done = true;
                Ok(did)
            }

            // One side stalled: the flowing side passes its inlet through.
            (SideFlow::Flowing { inlet, outlet, .. }, SideFlow::Zero) => {
                let t_in = match inlet_scalar(ctx.nodes, ctx.ports[inlet])? {
                    Some(t) => t,
                    None => return Ok(false),
                };
                let mut did = write_scalar(ctx.nodes, ctx.ports[outlet], t_in)?;
                for &p in peer_ports.iter() {
                    did |= mark_no_value(ctx.nodes, p)?;
                }
                self.done = true;
                Ok(did)
            }
            (SideFlow::Zero, SideFlow::Flowing { inlet, outlet, .. }) => {
                let t_in = match inlet_scalar(ctx.nodes, peer_ports[inlet])? {
                    Some(t) => t,
                    None => return Ok(false),
                };
                let mut did = write_scalar(ctx.nodes, peer_ports[outlet], t_in)?;
                for &p in ctx.ports.iter() {
                    did |= mark_no_value(ctx.nodes, p)?;
                }
                self.done = true;
                Ok(did)
            }

            (
                SideFlow::Flowing {
                    m: m_this,
                    inlet: in_this,
                    outlet: out_this,
                },
                SideFlow::Flowing {
                    m: m_other,
                    inlet: in_other,
                    outlet: out_other,
                },
            ) => {
                let t_in_this = match inlet_scalar(ctx.nodes, ctx.ports[in_this])? {
                    Some(t) => t,
                    None => return Ok(false),
                };
                let t_in_other = match inlet_scalar(ctx.nodes, peer_ports[in_other])? {
                    Some(t) => t,
                    None => return Ok(false),
                };

                let c_this = m_this * self.cp_this;
                let c_other = m_other * self.cp_other;
                let c_min = c_this.min(c_other);
                let c_max = c_this.max(c_other);
                let eps = self.effectiveness(c_min / c_max);
                let q = eps * c_min * (t_in_this - t_in_other);

                let t_out_this = t_in_this - q / c_this;
                let t_out_other = t_in_other + q / c_other;

                let mut did = write_scalar(ctx.nodes, ctx.ports[out_this], t_out_this)?;
                did |= write_scalar(ctx.nodes, peer_ports[out_other], t_out_other)?;
                self.done = true;
                Ok(did)
            }
        }
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        ports
            .iter()
            .all(|&p| crate::ctx::scalar_slot_updated(nodes, p))
    }
}

/// Scalar carrier of one energy-exchanger side.
#[derive(Debug, Clone, Copy)]
pub enum EnergyCarrier {
    /// Slot carries a temperature [K]; cp maps power to temperature change.
    Temperature { cp: Real },
    /// Slot carries a heat-energy [J/kg]; cp maps it onto a temperature.
    HeatEnergy { cp: Real },
}

impl EnergyCarrier {
    fn cp(self) -> Real {
        match self {
            EnergyCarrier::Temperature { cp } | EnergyCarrier::HeatEnergy { cp } => cp,
        }
    }

    fn as_temperature(self, slot_value: Real) -> Real {
        match self {
            EnergyCarrier::Temperature { .. } => slot_value,
            EnergyCarrier::HeatEnergy { cp } => slot_value / cp,
        }
    }

    fn from_temperature(self, t: Real) -> Real {
        match self {
            EnergyCarrier::Temperature { .. } => t,
            EnergyCarrier::HeatEnergy { cp } => t * cp,
        }
    }
}

impl From<ScalarKind> for EnergyCarrier {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Temperature { cp } => EnergyCarrier::Temperature { cp },
            ScalarKind::HeatEnergy => EnergyCarrier::HeatEnergy { cp: 1.0 },
        }
    }
}

/// No-mass exchanger between a heat-carrying and an energy-carrying path.
///
/// Each side exposes the energy rate it could absorb from the other:
/// `Δ = (T_other − T_in) · c_p · ṁ`. Transfer happens only when the two
/// deltas oppose; the transferred power is `η · min(|Δ_this|, |Δ_other|)`
/// and each side converts it into an outbound temperature or heat-energy.
#[derive(Debug, Clone)]
pub struct NoMassEnergyExchanger {
    pub carrier_this: EnergyCarrier,
    pub carrier_other: EnergyCarrier,
    pub eta: Real,
    role: ExchangerRole,
    done: bool,
}

impl NoMassEnergyExchanger {
    pub fn new(carrier_this: EnergyCarrier, eta: Real) -> Self {
        Self {
            carrier_this,
            carrier_other: carrier_this,
            eta,
            role: ExchangerRole::Secondary,
            done: false,
        }
    }

    pub fn set_other_side(&mut self, peer_ports: Vec<Port>, carrier_other: EnergyCarrier) {
        self.carrier_other = carrier_other;
        self.role = ExchangerRole::Primary { peer_ports };
    }

    pub fn prepare(&mut self) {
        self.done = false;
    }

    /// Max energy rate one side can absorb given the other side's temperature.
    fn max_energy_delta(t_other: Real, t_in: Real, cp: Real, m: Real) -> Real {
        (t_other - t_in) * cp * m
    }

    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        let peer_ports = match &self.role {
            ExchangerRole::Primary { peer_ports } => peer_ports.clone(),
            ExchangerRole::Secondary => return Ok(false),
        };
        if self.done {
            return Ok(false);
        }

        let this_side = resolve_side(ctx.nodes, ctx.ports)?;
        let other_side = resolve_side(ctx.nodes, &peer_ports)?;

        let (m_this, in_this, out_this, m_other, in_other, out_other) =
            match (this_side, other_side) {
                (SideFlow::Waiting, _) | (_, SideFlow::Waiting) => return Ok(false),
                (SideFlow::Zero, _) | (_, SideFlow::Zero) => {
                    // Either side stalled: no transfer is possible at all.
                    let mut did = false;
                    for (side, ports) in [(this_side, ctx.ports), (other_side, &peer_ports[..])] {
                        match side {
                            SideFlow::Zero => {
                                for &p in ports {
                                    did |= mark_no_value(ctx.nodes, p)?;
                                }
                            }
                            SideFlow::Flowing { inlet, outlet, .. } => {
                                let x_in = match inlet_scalar(ctx.nodes, ports[inlet])? {
                                    Some(x) => x,
                                    None => return Ok(false),
                                };
                                did |= write_scalar(ctx.nodes, ports[outlet], x_in)?;
                            }
                            SideFlow::Waiting => unreachable!(),
                        }
                    }
                    self.done = true;
                    return Ok(did);
                }
                (
                    SideFlow::Flowing {
                        m: mt,
                        inlet: it,
                        outlet: ot,
                    },
                    SideFlow::Flowing {
                        m: mo,
                        inlet: io,
                        outlet: oo,
                    },
                ) => (mt, it, ot, mo, io, oo),
            };

        let x_in_this = match inlet_scalar(ctx.nodes, ctx.ports[in_this])? {
            Some(x) => x,
            None => return Ok(false),
        };
        let x_in_other = match inlet_scalar(ctx.nodes, peer_ports[in_other])? {
            Some(x) => x,
            None => return Ok(false),
        };

        let t_this = self.carrier_this.as_temperature(x_in_this);
        let t_other = self.carrier_other.as_temperature(x_in_other);
        let d_this = Self::max_energy_delta(t_other, t_this, self.carrier_this.cp(), m_this);
        let d_other = Self::max_energy_delta(t_this, t_other, self.carrier_other.cp(), m_other);

        let mut did = false;
        if d_this == 0.0 || d_other == 0.0 || d_this.signum() == d_other.signum() {
            // No admissible transfer: both sides pass their inlet through.
            did |= write_scalar(ctx.nodes, ctx.ports[out_this], x_in_this)?;
            did |= write_scalar(ctx.nodes, peer_ports[out_other], x_in_other)?;
        } else {
            let power = self.eta * d_this.abs().min(d_other.abs());
            let p_this = power * d_this.signum();
            let t_out_this = t_this + p_this / (self.carrier_this.cp() * m_this);
            let t_out_other = t_other - p_this / (self.carrier_other.cp() * m_other);
            did |= write_scalar(
                ctx.nodes,
                ctx.ports[out_this],
                self.carrier_this.from_temperature(t_out_this),
            )?;
            did |= write_scalar(
                ctx.nodes,
                peer_ports[out_other],
                self.carrier_other.from_temperature(t_out_other),
            )?;
        }
        self.done = true;
        Ok(did)
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[Node]) -> bool {
        ports
            .iter()
            .all(|&p| crate::ctx::scalar_slot_updated(nodes, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effectiveness_limits() {
        let ex = NoMassExchanger::new(4186.0, 2.0);
        // Balanced capacities: ntu/(1+ntu).
        let eps_balanced = ex.effectiveness(1.0);
        assert!((eps_balanced - 2.0 / 3.0).abs() < 1e-12);

        // Effectiveness always sits in [0, 1] and grows toward 1 as the
        // capacity ratio drops.
        let eps_skewed = ex.effectiveness(0.1);
        assert!(eps_skewed > eps_balanced);
        assert!(eps_skewed < 1.0);
        assert!(ex.effectiveness(0.999_999) > 0.0);
    }

    #[test]
    fn energy_carrier_conversions() {
        let t = EnergyCarrier::Temperature { cp: 4186.0 };
        assert_eq!(t.as_temperature(300.0), 300.0);
        assert_eq!(t.from_temperature(300.0), 300.0);

        let e = EnergyCarrier::HeatEnergy { cp: 4186.0 };
        assert_eq!(e.as_temperature(4186.0 * 300.0), 300.0);
        assert_eq!(e.from_temperature(300.0), 4186.0 * 300.0);
    }
}
