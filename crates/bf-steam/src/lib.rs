//! bf-steam: steam property oracle for bondflow.
//!
//! Provides:
//! - the `SteamTable` trait: a named scalar property function
//!   `(key, args…) -> f64` with typed convenience methods
//! - `CurveFitTable`: a bundled approximate water/steam backend
//!
//! # Architecture
//!
//! The rest of the engine only sees the `SteamTable` trait; the property
//! backend is replaceable. `CurveFitTable` is a saturation-curve fit with
//! frozen heat capacities, calibrated near atmospheric pressure — accurate
//! enough for network simulation, not for plant design.

pub mod curvefit;
pub mod error;
pub mod table;

pub use curvefit::CurveFitTable;
pub use error::{SteamError, SteamResult};
pub use table::{PropertyKey, SteamTable};

/// Specific enthalpy [J/kg].
///
/// Not part of uom's standard set, so we use f64 with clear documentation.
pub type SpecEnthalpy = f64;

/// Specific entropy [J/(kg·K)].
pub type SpecEntropy = f64;

/// Specific heat capacity [J/(kg·K)].
pub type SpecHeatCapacity = f64;

/// Specific volume [m³/kg].
pub type SpecVolume = f64;
