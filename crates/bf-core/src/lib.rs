//! bf-core: stable foundation for bondflow.
//!
//! Contains:
//! - ids (stable compact IDs for graph objects)
//! - numeric (Real + tolerances + float helpers)
//! - units (uom SI types + constructors)
//! - error (the boundary error taxonomy)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{EngineError, EngineResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
