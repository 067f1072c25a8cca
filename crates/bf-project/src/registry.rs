//! Registry of initial-condition records for a whole network.

use std::collections::BTreeMap;

use bf_core::{ElemId, EngineError, EngineResult};
use bf_solver::Network;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::StateRecord;

/// Named initial-condition records, serializable as one document.
///
/// Records are keyed by element name; ordering is stable (BTreeMap) so the
/// serialized form diffs cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialConditions {
    pub version: u32,
    pub id: Uuid,
    pub records: BTreeMap<String, StateRecord>,
}

impl InitialConditions {
    pub fn new() -> Self {
        Self {
            version: 1,
            id: Uuid::new_v4(),
            records: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, record: StateRecord) {
        self.records
            .insert(record.element_name().to_string(), record);
    }

    pub fn get(&self, element_name: &str) -> Option<&StateRecord> {
        self.records.get(element_name)
    }

    /// Capture every stateful element of the network.
    pub fn capture(net: &Network) -> Self {
        let mut out = Self::new();
        for elem in net.elements() {
            let state = elem.capture_state();
            if let Some(record) = StateRecord::from_element_state(&state) {
                out.insert(record);
            }
        }
        out
    }

    /// Apply every record to its named element. Unknown names are a model
    /// error; elements without a record keep their current state.
    pub fn apply(&self, net: &mut Network) -> EngineResult<()> {
        for (name, record) in &self.records {
            let id = Self::find_element(net, name).ok_or_else(|| {
                EngineError::model(format!("initial condition for unknown element '{name}'"))
            })?;
            let state = record.to_element_state();
            net.element_mut(id).apply_state(&state)?;
        }
        Ok(())
    }

    fn find_element(net: &Network, name: &str) -> Option<ElemId> {
        net.elements()
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::model(format!("initial-condition encoding failed: {e}")))
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| EngineError::model(format!("initial-condition decoding failed: {e}")))
    }

    pub fn to_yaml(&self) -> EngineResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| EngineError::model(format!("initial-condition encoding failed: {e}")))
    }

    pub fn from_yaml(text: &str) -> EngineResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| EngineError::model(format!("initial-condition decoding failed: {e}")))
    }
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self::new()
    }
}
