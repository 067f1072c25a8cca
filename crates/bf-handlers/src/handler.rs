//! The handler container: one tagged variant per transport behavior.

use bf_core::{EngineError, EngineResult, Real};
use bf_graph::Port;

use crate::connection::Connection;
use crate::ctx::HandlerCtx;
use crate::exchanger::{NoMassEnergyExchanger, NoMassExchanger};
use crate::phased::PhasedExpanding;
use crate::scalar::{Mix, ThermalCoupled, Volumized};
use crate::steam::{IsenthalpicExpansion, IsobaricIsochoric, SaturatedSeparation};

/// Scalar-transport behavior composed into an extension-aware element.
#[derive(Debug, Clone)]
pub enum Handler {
    Mix(Mix),
    Volumized(Volumized),
    ThermalCoupled(ThermalCoupled),
    NoMassExchanger(NoMassExchanger),
    NoMassEnergyExchanger(NoMassEnergyExchanger),
    Connection(Connection),
    IsenthalpicExpansion(IsenthalpicExpansion),
    SaturatedSeparation(SaturatedSeparation),
    IsobaricIsochoric(IsobaricIsochoric),
    PhasedExpanding(PhasedExpanding),
}

impl Handler {
    fn kind_name(&self) -> &'static str {
        match self {
            Handler::Mix(_) => "mix",
            Handler::Volumized(_) => "volumized",
            Handler::ThermalCoupled(_) => "thermal-coupled",
            Handler::NoMassExchanger(_) => "no-mass exchanger",
            Handler::NoMassEnergyExchanger(_) => "no-mass energy exchanger",
            Handler::Connection(_) => "connection",
            Handler::IsenthalpicExpansion(_) => "isenthalpic expansion",
            Handler::SaturatedSeparation(_) => "saturated separation",
            Handler::IsobaricIsochoric(_) => "isobaric-isochoric",
            Handler::PhasedExpanding(_) => "phased expanding",
        }
    }

    fn unsupported(&self, op: &str) -> EngineError {
        EngineError::missing_state(format!(
            "{} handler does not support {op}",
            self.kind_name()
        ))
    }

    /// Per-cycle reset; commits prepared next-state where the variant holds
    /// state.
    pub fn prepare(&mut self) {
        match self {
            Handler::Mix(_) | Handler::Connection(_) => {}
            Handler::Volumized(h) => h.prepare(),
            Handler::ThermalCoupled(h) => h.prepare(),
            Handler::NoMassExchanger(h) => h.prepare(),
            Handler::NoMassEnergyExchanger(h) => h.prepare(),
            Handler::IsenthalpicExpansion(h) => h.prepare(),
            Handler::SaturatedSeparation(h) => h.prepare(),
            Handler::IsobaricIsochoric(h) => h.prepare(),
            Handler::PhasedExpanding(h) => h.prepare(),
        }
    }

    /// Derive whatever the current slot states allow; true means progress.
    pub fn do_calculation(&mut self, ctx: &mut HandlerCtx<'_>) -> EngineResult<bool> {
        match self {
            Handler::Mix(h) => h.do_calculation(ctx),
            Handler::Volumized(h) => h.do_calculation(ctx),
            Handler::ThermalCoupled(h) => h.do_calculation(ctx),
            Handler::NoMassExchanger(h) => h.do_calculation(ctx),
            Handler::NoMassEnergyExchanger(h) => h.do_calculation(ctx),
            Handler::Connection(h) => h.do_calculation(ctx),
            Handler::IsenthalpicExpansion(h) => h.do_calculation(ctx),
            Handler::SaturatedSeparation(h) => h.do_calculation(ctx),
            Handler::IsobaricIsochoric(h) => h.do_calculation(ctx),
            Handler::PhasedExpanding(h) => h.do_calculation(ctx),
        }
    }

    pub fn is_finished(&self, ports: &[Port], nodes: &[bf_graph::Node]) -> bool {
        match self {
            Handler::Mix(h) => h.is_finished(ports, nodes),
            Handler::Volumized(h) => h.is_finished(ports, nodes),
            Handler::ThermalCoupled(h) => h.is_finished(ports, nodes),
            Handler::NoMassExchanger(h) => h.is_finished(ports, nodes),
            Handler::NoMassEnergyExchanger(h) => h.is_finished(ports, nodes),
            Handler::Connection(h) => h.is_finished(ports, nodes),
            Handler::IsenthalpicExpansion(h) => h.is_finished(ports, nodes),
            Handler::SaturatedSeparation(h) => h.is_finished(ports, nodes),
            Handler::IsobaricIsochoric(h) => h.is_finished(ports, nodes),
            Handler::PhasedExpanding(h) => h.is_finished(ports, nodes),
        }
    }

    /// Cascade the model step time into stateful variants.
    pub fn set_step_time(&mut self, dt: Real) {
        match self {
            Handler::Volumized(h) => h.set_step_time(dt),
            Handler::ThermalCoupled(h) => h.inner.set_step_time(dt),
            Handler::SaturatedSeparation(h) => h.set_step_time(dt),
            Handler::IsobaricIsochoric(h) => h.set_step_time(dt),
            Handler::PhasedExpanding(h) => h.set_step_time(dt),
            _ => {}
        }
    }

    /// Set the handler's own scalar (temperature or heat-energy).
    ///
    /// Only variants with intrinsic capacity can; the rest fail with the
    /// missing-state-variable kind.
    pub fn set_initial(&mut self, value: Real) -> EngineResult<()> {
        match self {
            Handler::Volumized(h) => {
                h.set_initial(value);
                Ok(())
            }
            Handler::ThermalCoupled(h) => {
                h.inner.set_initial(value);
                Ok(())
            }
            _ => Err(self.unsupported("setting its scalar state")),
        }
    }

    /// Read the handler's own scalar.
    pub fn get_value(&self) -> EngineResult<Real> {
        match self {
            Handler::Volumized(h) => Ok(h.value()),
            Handler::ThermalCoupled(h) => Ok(h.inner.value()),
            Handler::SaturatedSeparation(h) => Ok(h.temperature()),
            Handler::IsobaricIsochoric(h) => Ok(h.heat_energy()),
            Handler::PhasedExpanding(h) => Ok(h.heat_energy()),
            _ => Err(self.unsupported("reading its scalar state")),
        }
    }

    /// Set the inner mass (or capacity) of a storage variant.
    pub fn set_mass_or_capacity(&mut self, mass: Real) -> EngineResult<()> {
        match self {
            Handler::Volumized(h) => h.set_inner_mass(mass),
            Handler::ThermalCoupled(h) => h.inner.set_inner_mass(mass),
            _ => Err(self.unsupported("setting a mass or capacity")),
        }
    }

    /// Effort the owning element must impose, when the handler owns it
    /// (saturated-separation reservoir pressure).
    pub fn imposed_effort(&self) -> Option<Real> {
        match self {
            Handler::SaturatedSeparation(h) => Some(h.imposed_effort()),
            _ => None,
        }
    }

    /// True when the owning element must NOT impose an effort of its own:
    /// the handler treats pressure as a boundary condition taken from the
    /// network (fixed-volume evaporators).
    pub fn suppresses_effort(&self) -> bool {
        matches!(
            self,
            Handler::IsobaricIsochoric(_) | Handler::PhasedExpanding(_)
        )
    }

    /// Current scalar published to a coupled thermal effort source at
    /// prepare time.
    pub fn coupling_effort(&self) -> Option<Real> {
        match self {
            Handler::ThermalCoupled(h) => Some(h.inner.value()),
            _ => None,
        }
    }

    /// Attachment of the coupled thermal source, where wired.
    pub fn thermal_port(&self) -> Option<Port> {
        match self {
            Handler::ThermalCoupled(h) => h.thermal_port(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKind;

    #[test]
    fn capacity_less_variants_reject_state_ops() {
        let mut h = Handler::Mix(Mix::new(ScalarKind::Temperature { cp: 4186.0 }));
        assert!(matches!(
            h.set_initial(300.0),
            Err(EngineError::MissingStateVariable { .. })
        ));
        assert!(matches!(
            h.get_value(),
            Err(EngineError::MissingStateVariable { .. })
        ));
        assert!(matches!(
            h.set_mass_or_capacity(10.0),
            Err(EngineError::MissingStateVariable { .. })
        ));
    }

    #[test]
    fn volumized_round_trips_state() {
        let mut h = Handler::Volumized(Volumized::new(ScalarKind::Temperature { cp: 4186.0 }));
        h.set_mass_or_capacity(100.0).unwrap();
        h.set_initial(298.15).unwrap();
        assert_eq!(h.get_value().unwrap(), 298.15);
    }
}
