//! bf-graph: nodes, slots, and the domain taxonomy for bondflow.
//!
//! A network is a directed multigraph whose vertices are nodes and whose
//! hyperedges are elements. This crate owns the node side: the effort
//! scalar, the per-element flow slots, the optional scalar-extension
//! containers (temperature, heat-energy, steam state), and the distribution
//! rules a node applies to them (Kirchhoff completion and mixing).
//!
//! The monotonic `updated`-bit protocol on slots is the engine's scheduling
//! mechanism: bits only grow during a step cycle and are reset by `prepare`.

pub mod domain;
pub mod node;
pub mod slot;

pub use domain::{ElementCategory, ExtensionKind, PhysicalDomain};
pub use node::{Node, NodeExtension, Port};
pub use slot::{FlowSlot, ScalarSlot, SteamProps, SteamSlot};
