//! Per-element value slots with the monotonic updated-bit protocol.
//!
//! Protocol, shared by all slot kinds:
//! - `updated` only ever turns on during a step cycle; `prepare` resets it.
//! - writing an updated slot with an equal value (within tolerance) is a
//!   no-op; writing a different value means two derivation paths disagreed
//!   and is a Calculation error.
//! - reading a slot that is not updated, or whose `no_value` mark is set,
//!   is a contract violation (Calculation error).
//! - `no_value` marks a zero-flow slot that cannot carry a scalar; it is
//!   only ever set after `updated`.

use bf_core::{EngineError, EngineResult, Real, Tolerances, nearly_equal};

/// Signed flow on one element-node pair.
///
/// Sign convention: positive is flow from the node into the element.
#[derive(Debug, Clone, Default)]
pub struct FlowSlot {
    value: Real,
    updated: bool,
}

impl FlowSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Read the derived flow; erroring on a not-yet-updated slot.
    pub fn value(&self) -> EngineResult<Real> {
        if !self.updated {
            return Err(EngineError::calculation(
                "flow slot read before it was updated",
            ));
        }
        Ok(self.value)
    }

    /// Derive the flow. Returns whether the slot transitioned.
    pub fn set(&mut self, value: Real, tol: Tolerances) -> EngineResult<bool> {
        if !value.is_finite() {
            return Err(EngineError::calculation("derived a non-finite flow"));
        }
        if self.updated {
            if nearly_equal(self.value, value, tol) {
                return Ok(false);
            }
            return Err(EngineError::calculation(format!(
                "conflicting flow derivations: {} vs {}",
                self.value, value
            )));
        }
        self.value = value;
        self.updated = true;
        Ok(true)
    }

    pub fn prepare(&mut self) {
        self.updated = false;
    }
}

/// A transported scalar (temperature or heat-energy) on one element-node pair.
#[derive(Debug, Clone, Default)]
pub struct ScalarSlot {
    value: Real,
    updated: bool,
    no_value: bool,
}

impl ScalarSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Updated and carrying an actual value.
    pub fn has_value(&self) -> bool {
        self.updated && !self.no_value
    }

    /// Updated but marked as carrying no scalar (zero-flow degeneracy).
    pub fn is_no_value(&self) -> bool {
        self.updated && self.no_value
    }

    pub fn value(&self) -> EngineResult<Real> {
        if !self.updated {
            return Err(EngineError::calculation(
                "scalar slot read before it was updated",
            ));
        }
        if self.no_value {
            return Err(EngineError::calculation(
                "scalar slot read while it carries no value",
            ));
        }
        Ok(self.value)
    }

    pub fn set(&mut self, value: Real, tol: Tolerances) -> EngineResult<bool> {
        if !value.is_finite() {
            return Err(EngineError::calculation("derived a non-finite scalar"));
        }
        if self.updated {
            if self.no_value {
                return Err(EngineError::calculation(
                    "scalar derived for a slot already marked no-value",
                ));
            }
            if nearly_equal(self.value, value, tol) {
                return Ok(false);
            }
            return Err(EngineError::calculation(format!(
                "conflicting scalar derivations: {} vs {}",
                self.value, value
            )));
        }
        self.value = value;
        self.updated = true;
        self.no_value = false;
        Ok(true)
    }

    /// Mark the slot as carrying no scalar. Returns whether it transitioned.
    pub fn set_no_value(&mut self) -> EngineResult<bool> {
        if self.updated {
            if self.no_value {
                return Ok(false);
            }
            return Err(EngineError::calculation(
                "no-value mark on a slot that already carries a scalar",
            ));
        }
        self.updated = true;
        self.no_value = true;
        Ok(true)
    }

    pub fn prepare(&mut self) {
        self.updated = false;
        self.no_value = false;
    }
}

/// The steam state 4-tuple carried by a steam slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteamProps {
    /// Temperature [K].
    pub t: Real,
    /// Specific enthalpy [J/kg].
    pub h: Real,
    /// Specific entropy [J/(kg·K)].
    pub s: Real,
    /// Vapor quality (0..=1).
    pub x: Real,
}

impl SteamProps {
    pub fn new(t: Real, h: Real, s: Real, x: Real) -> Self {
        Self { t, h, s, x }
    }

    pub fn is_finite(&self) -> bool {
        self.t.is_finite() && self.h.is_finite() && self.s.is_finite() && self.x.is_finite()
    }
}

/// A steam state on one element-node pair.
#[derive(Debug, Clone, Default)]
pub struct SteamSlot {
    props: Option<SteamProps>,
    updated: bool,
    no_value: bool,
}

impl SteamSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn has_value(&self) -> bool {
        self.updated && !self.no_value
    }

    pub fn is_no_value(&self) -> bool {
        self.updated && self.no_value
    }

    pub fn props(&self) -> EngineResult<SteamProps> {
        if !self.updated {
            return Err(EngineError::calculation(
                "steam slot read before it was updated",
            ));
        }
        match (&self.props, self.no_value) {
            (Some(p), false) => Ok(*p),
            _ => Err(EngineError::calculation(
                "steam slot read while it carries no properties",
            )),
        }
    }

    pub fn set(&mut self, props: SteamProps, tol: Tolerances) -> EngineResult<bool> {
        if !props.is_finite() {
            return Err(EngineError::calculation("derived a non-finite steam state"));
        }
        if self.updated {
            if self.no_value {
                return Err(EngineError::calculation(
                    "steam state derived for a slot already marked no-properties",
                ));
            }
            let prev = self.props.expect("updated steam slot holds props");
            if nearly_equal(prev.h, props.h, tol) && nearly_equal(prev.t, props.t, tol) {
                return Ok(false);
            }
            return Err(EngineError::calculation(format!(
                "conflicting steam derivations: h {} vs {}",
                prev.h, props.h
            )));
        }
        self.props = Some(props);
        self.updated = true;
        self.no_value = false;
        Ok(true)
    }

    pub fn set_no_value(&mut self) -> EngineResult<bool> {
        if self.updated {
            if self.no_value {
                return Ok(false);
            }
            return Err(EngineError::calculation(
                "no-properties mark on a slot that already carries a steam state",
            ));
        }
        self.updated = true;
        self.no_value = true;
        Ok(true)
    }

    pub fn prepare(&mut self) {
        self.updated = false;
        self.no_value = false;
        self.props = None;
    }
}
