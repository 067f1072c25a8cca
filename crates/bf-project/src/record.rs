//! Schema of one persisted element state.

use bf_core::Real;
use bf_elements::ElementState;
use serde::{Deserialize, Serialize};

/// Persisted element state, discriminated by record kind.
///
/// Each variant carries exactly the fields that element family's persistent
/// state demands. The mandatory key is `element_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StateRecord {
    /// Plain capacitive or inductive storage.
    Storage {
        element_name: String,
        state_value: Real,
    },
    /// Storage with an inner scalar capacity (volumized and
    /// thermal-coupled handlers).
    ScalarStorage {
        element_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state_value: Option<Real>,
        temperature: Real,
        inner_mass: Real,
    },
    /// Saturated-separation reservoir.
    Reservoir {
        element_name: String,
        temperature: Real,
        inner_mass: Real,
        previous_pressure: Real,
        ambient_pressure: Real,
    },
    /// Fixed-volume evaporator.
    Evaporator {
        element_name: String,
        heat_energy: Real,
        inner_mass: Real,
        negative_mass: Real,
        previous_pressure: Real,
    },
    /// Expanding phased-fluid exchanger.
    PhasedExchanger {
        element_name: String,
        heat_energy: Real,
        inner_mass: Real,
        negative_mass: Real,
        delayed_in_heat_energy: Real,
    },
}

impl StateRecord {
    pub fn element_name(&self) -> &str {
        match self {
            StateRecord::Storage { element_name, .. }
            | StateRecord::ScalarStorage { element_name, .. }
            | StateRecord::Reservoir { element_name, .. }
            | StateRecord::Evaporator { element_name, .. }
            | StateRecord::PhasedExchanger { element_name, .. } => element_name,
        }
    }

    /// Build the record from a captured element state; `None` when the
    /// element has no persistent state at all.
    pub fn from_element_state(state: &ElementState) -> Option<Self> {
        let name = state.element_name.clone();
        if let (Some(e), Some(m), Some(d)) = (
            state.heat_energy,
            state.inner_mass,
            state.delayed_in_heat_energy,
        ) {
            return Some(StateRecord::PhasedExchanger {
                element_name: name,
                heat_energy: e,
                inner_mass: m,
                negative_mass: state.negative_mass.unwrap_or(0.0),
                delayed_in_heat_energy: d,
            });
        }
        if let (Some(e), Some(m), Some(p)) = (
            state.heat_energy,
            state.inner_mass,
            state.previous_pressure,
        ) {
            return Some(StateRecord::Evaporator {
                element_name: name,
                heat_energy: e,
                inner_mass: m,
                negative_mass: state.negative_mass.unwrap_or(0.0),
                previous_pressure: p,
            });
        }
        if let (Some(t), Some(m), Some(p), Some(pa)) = (
            state.temperature,
            state.inner_mass,
            state.previous_pressure,
            state.ambient_pressure,
        ) {
            return Some(StateRecord::Reservoir {
                element_name: name,
                temperature: t,
                inner_mass: m,
                previous_pressure: p,
                ambient_pressure: pa,
            });
        }
        if let (Some(t), Some(m)) = (state.temperature, state.inner_mass) {
            return Some(StateRecord::ScalarStorage {
                element_name: name,
                state_value: state.state_value,
                temperature: t,
                inner_mass: m,
            });
        }
        state.state_value.map(|v| StateRecord::Storage {
            element_name: name,
            state_value: v,
        })
    }

    /// Expand back into the element-state shape for `apply_state`.
    pub fn to_element_state(&self) -> ElementState {
        let mut out = ElementState {
            element_name: self.element_name().to_string(),
            ..ElementState::default()
        };
        match self {
            StateRecord::Storage { state_value, .. } => {
                out.state_value = Some(*state_value);
            }
            StateRecord::ScalarStorage {
                state_value,
                temperature,
                inner_mass,
                ..
            } => {
                out.state_value = *state_value;
                out.temperature = Some(*temperature);
                out.inner_mass = Some(*inner_mass);
            }
            StateRecord::Reservoir {
                temperature,
                inner_mass,
                previous_pressure,
                ambient_pressure,
                ..
            } => {
                out.temperature = Some(*temperature);
                out.inner_mass = Some(*inner_mass);
                out.previous_pressure = Some(*previous_pressure);
                out.ambient_pressure = Some(*ambient_pressure);
            }
            StateRecord::Evaporator {
                heat_energy,
                inner_mass,
                negative_mass,
                previous_pressure,
                ..
            } => {
                out.heat_energy = Some(*heat_energy);
                out.inner_mass = Some(*inner_mass);
                out.negative_mass = Some(*negative_mass);
                out.previous_pressure = Some(*previous_pressure);
            }
            StateRecord::PhasedExchanger {
                heat_energy,
                inner_mass,
                negative_mass,
                delayed_in_heat_energy,
                ..
            } => {
                out.heat_energy = Some(*heat_energy);
                out.inner_mass = Some(*inner_mass);
                out.negative_mass = Some(*negative_mass);
                out.delayed_in_heat_energy = Some(*delayed_in_heat_energy);
            }
        }
        out
    }
}
