//! bf-solver: model assembly and the fixed-point sweep driver.
//!
//! The solver advances a network one fixed timestep at a time:
//!
//! 1. `prepare` resets every updated mark and commits prepared storage
//!    state into current state.
//! 2. `step_once` sweeps `step` over all elements (and the node
//!    distribution rules) until a full sweep reports no change, then
//!    verifies every element is finished.
//!
//! Termination rests on the monotonic updated-bit protocol: each sweep can
//! only add derivations, and a sweep cap of `N_elements × 16` turns
//! livelocks into a diagnosable error.

pub mod assemble;
pub mod network;
pub mod sweep;

pub use assemble::ModelBuilder;
pub use network::Network;
pub use sweep::Solver;
