//! Closed enumerations of physical domains and element categories.

/// The physical domain of a node or element.
///
/// Each domain fixes the semantic unit of effort and flow; the three fluid
/// extensions additionally layer a scalar payload on the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalDomain {
    /// Effort = voltage [V], flow = current [A].
    Electrical,
    /// Effort = force/velocity pair per analogy, flow dual.
    Mechanical,
    /// Effort = pressure [Pa], flow = volumetric or mass flow.
    Hydraulic,
    /// Effort = pressure [Pa], flow = mass flow [kg/s].
    Pneumatic,
    /// Effort = temperature [K], flow = heat rate [W].
    Thermal,
    /// Hydraulic substrate plus a transported temperature [K].
    HeatFluid,
    /// Hydraulic substrate plus a transported heat-energy [J/kg].
    PhasedFluid,
    /// Hydraulic substrate plus a transported steam state (T, h, s, x).
    Steam,
    /// Elements bridging two domains (converters).
    Multidomain,
}

/// Which scalar-extension container a node of this domain carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    None,
    Temperature,
    HeatEnergy,
    Steam,
}

impl PhysicalDomain {
    /// The scalar extension riding on this domain's flow, if any.
    pub fn extension(self) -> ExtensionKind {
        match self {
            PhysicalDomain::HeatFluid => ExtensionKind::Temperature,
            PhysicalDomain::PhasedFluid => ExtensionKind::HeatEnergy,
            PhysicalDomain::Steam => ExtensionKind::Steam,
            _ => ExtensionKind::None,
        }
    }

    /// True for domains whose flow carries mass (the fluid family).
    pub fn carries_mass(self) -> bool {
        matches!(
            self,
            PhysicalDomain::Hydraulic
                | PhysicalDomain::Pneumatic
                | PhysicalDomain::HeatFluid
                | PhysicalDomain::PhasedFluid
                | PhysicalDomain::Steam
        )
    }

    /// Unit of the effort variable (diagnostics only).
    pub fn effort_unit(self) -> &'static str {
        match self {
            PhysicalDomain::Electrical => "V",
            PhysicalDomain::Mechanical => "N",
            PhysicalDomain::Hydraulic
            | PhysicalDomain::Pneumatic
            | PhysicalDomain::PhasedFluid
            | PhysicalDomain::Steam => "Pa",
            PhysicalDomain::HeatFluid => "Pa",
            PhysicalDomain::Thermal => "K",
            PhysicalDomain::Multidomain => "-",
        }
    }

    /// Unit of the flow variable (diagnostics only).
    pub fn flow_unit(self) -> &'static str {
        match self {
            PhysicalDomain::Electrical => "A",
            PhysicalDomain::Mechanical => "m/s",
            PhysicalDomain::Hydraulic
            | PhysicalDomain::Pneumatic
            | PhysicalDomain::HeatFluid
            | PhysicalDomain::PhasedFluid
            | PhysicalDomain::Steam => "kg/s",
            PhysicalDomain::Thermal => "W",
            PhysicalDomain::Multidomain => "-",
        }
    }
}

/// The abstract behavioral category of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    /// Placeholder; never valid on a user-built element.
    None,
    /// No connection: flow forced to 0, effort unconstrained.
    Open,
    /// Effort equal on all incident nodes; flow passes through.
    Bridged,
    /// Linear or nonlinear effort/flow relation.
    Dissipator,
    /// Stores the integral of flow; imposes effort.
    Capacitance,
    /// Stores the integral of effort; imposes flow.
    Inductance,
    /// Imposes a configured flow through itself.
    FlowSource,
    /// Imposes a configured effort on its nodes.
    EffortSource,
    /// Imposes both effort and flow on its single node.
    Enforcer,
    /// Imposes effort only on its single node; flow is free.
    Origin,
}

impl ElementCategory {
    /// Whether a user-built element of this category is valid in `domain`.
    ///
    /// `None` never is; `Inductance` exists for the electrical and
    /// mechanical domains only.
    pub fn valid_in(self, domain: PhysicalDomain) -> bool {
        match self {
            ElementCategory::None => false,
            ElementCategory::Inductance => matches!(
                domain,
                PhysicalDomain::Electrical | PhysicalDomain::Mechanical
            ),
            _ => true,
        }
    }

    /// How many incident nodes this category accepts.
    pub fn max_ports(self) -> usize {
        match self {
            ElementCategory::Enforcer | ElementCategory::Origin => 1,
            ElementCategory::None => 0,
            // Bridged and capacitive elements accept a whole junction.
            ElementCategory::Bridged | ElementCategory::Capacitance | ElementCategory::Open => {
                usize::MAX
            }
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluid_extensions() {
        assert_eq!(
            PhysicalDomain::HeatFluid.extension(),
            ExtensionKind::Temperature
        );
        assert_eq!(
            PhysicalDomain::PhasedFluid.extension(),
            ExtensionKind::HeatEnergy
        );
        assert_eq!(PhysicalDomain::Steam.extension(), ExtensionKind::Steam);
        assert_eq!(PhysicalDomain::Hydraulic.extension(), ExtensionKind::None);
    }

    #[test]
    fn inductance_is_domain_limited() {
        assert!(ElementCategory::Inductance.valid_in(PhysicalDomain::Electrical));
        assert!(ElementCategory::Inductance.valid_in(PhysicalDomain::Mechanical));
        assert!(!ElementCategory::Inductance.valid_in(PhysicalDomain::Hydraulic));
        assert!(!ElementCategory::None.valid_in(PhysicalDomain::Electrical));
    }

    #[test]
    fn port_limits() {
        assert_eq!(ElementCategory::Enforcer.max_ports(), 1);
        assert_eq!(ElementCategory::Origin.max_ports(), 1);
        assert_eq!(ElementCategory::Dissipator.max_ports(), 2);
        assert!(ElementCategory::Bridged.max_ports() > 2);
    }
}
