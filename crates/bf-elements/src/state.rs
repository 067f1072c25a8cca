//! Persistent element state: capture and restore.
//!
//! The record carries every field an element's persistent state can demand;
//! which ones are present depends on the element. Loading validates the
//! record's name against the element's.

use bf_core::{EngineError, EngineResult, Real};
use bf_handlers::Handler;

use crate::element::{Element, Kind};

/// Named snapshot of an element's persistent state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementState {
    pub element_name: String,
    pub state_value: Option<Real>,
    pub temperature: Option<Real>,
    pub heat_energy: Option<Real>,
    pub inner_mass: Option<Real>,
    pub previous_pressure: Option<Real>,
    pub negative_mass: Option<Real>,
    pub delayed_in_heat_energy: Option<Real>,
    pub ambient_pressure: Option<Real>,
}

impl Element {
    /// Snapshot the element's persistent state.
    pub fn capture_state(&self) -> ElementState {
        let mut state = ElementState {
            element_name: self.name.clone(),
            ..ElementState::default()
        };

        match self.kind() {
            Kind::Capacitance(st) | Kind::Inductance(st) => {
                state.state_value = Some(st.state_value());
            }
            _ => {}
        }

        match self.handler() {
            Some(Handler::Volumized(h)) => {
                state.temperature = Some(h.value());
                state.inner_mass = Some(h.inner_mass());
            }
            Some(Handler::ThermalCoupled(h)) => {
                state.temperature = Some(h.inner.value());
                state.inner_mass = Some(h.inner.inner_mass());
            }
            Some(Handler::SaturatedSeparation(h)) => {
                state.temperature = Some(h.temperature());
                state.inner_mass = Some(h.total_mass());
                state.previous_pressure = Some(h.imposed_effort());
                state.ambient_pressure = Some(h.ambient_pressure());
            }
            Some(Handler::IsobaricIsochoric(h)) => {
                state.heat_energy = Some(h.heat_energy());
                state.inner_mass = Some(h.inner_mass());
                state.negative_mass = Some(h.negative_mass());
                state.previous_pressure = Some(h.previous_pressure());
            }
            Some(Handler::PhasedExpanding(h)) => {
                state.heat_energy = Some(h.heat_energy());
                state.inner_mass = Some(h.inner_heated_mass());
                state.negative_mass = Some(h.negative_mass());
                state.delayed_in_heat_energy = Some(h.delayed_in_heat_energy());
            }
            _ => {}
        }

        state
    }

    /// Restore a previously captured state. The record must name this
    /// element.
    pub fn apply_state(&mut self, state: &ElementState) -> EngineResult<()> {
        if state.element_name != self.name {
            return Err(EngineError::model(format!(
                "state record '{}' applied to element '{}'",
                state.element_name, self.name
            )));
        }

        if let Some(v) = state.state_value {
            match self.kind_mut() {
                Kind::Capacitance(st) | Kind::Inductance(st) => st.set_state_value(v),
                _ => {
                    return Err(EngineError::model(format!(
                        "element '{}' holds no storage state",
                        self.name
                    )));
                }
            }
        }

        match self.handler_mut() {
            Some(Handler::Volumized(h)) => {
                if let Some(t) = state.temperature {
                    h.set_initial(t);
                }
                if let Some(m) = state.inner_mass {
                    h.set_inner_mass(m)?;
                }
            }
            Some(Handler::ThermalCoupled(h)) => {
                if let Some(t) = state.temperature {
                    h.inner.set_initial(t);
                }
                if let Some(m) = state.inner_mass {
                    h.inner.set_inner_mass(m)?;
                }
            }
            Some(Handler::SaturatedSeparation(h)) => {
                if let (Some(t), Some(m), Some(p), Some(pa)) = (
                    state.temperature,
                    state.inner_mass,
                    state.previous_pressure,
                    state.ambient_pressure,
                ) {
                    h.restore(t, m, p, pa)?;
                }
            }
            Some(Handler::IsobaricIsochoric(h)) => {
                if let (Some(e), Some(m)) = (state.heat_energy, state.inner_mass) {
                    h.restore(
                        e,
                        m,
                        state.negative_mass.unwrap_or(0.0),
                        state.previous_pressure.unwrap_or(0.0),
                    );
                }
            }
            Some(Handler::PhasedExpanding(h)) => {
                if let (Some(e), Some(m)) = (state.heat_energy, state.inner_mass) {
                    h.restore(
                        e,
                        m,
                        state.negative_mass.unwrap_or(0.0),
                        state.delayed_in_heat_energy.unwrap_or(0.0),
                    );
                }
            }
            _ => {}
        }

        Ok(())
    }
}
