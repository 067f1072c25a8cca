//! bf-handlers: scalar-transport handlers for bondflow elements.
//!
//! A handler adds extension semantics (temperature, heat-energy, or steam
//! state) to an element. Elements whose domain is one of the fluid
//! extensions compose exactly one handler in; the handler owns the
//! element's scalar state when the element has intrinsic capacity.
//!
//! Every variant implements the same protocol: `prepare` (commit prepared
//! state, clear per-cycle marks), `do_calculation` (derive whatever the
//! current slot states allow, report progress), `is_finished`. Operations a
//! capacity-less variant cannot support fail with the missing-state-variable
//! error kind.

pub mod connection;
pub mod ctx;
pub mod exchanger;
pub mod handler;
pub mod phased;
pub mod scalar;
pub mod steam;

pub use connection::{Connection, ConnectionKind};
pub use ctx::HandlerCtx;
pub use exchanger::{EnergyCarrier, ExchangerRole, NoMassEnergyExchanger, NoMassExchanger};
pub use handler::Handler;
pub use phased::PhasedExpanding;
pub use scalar::{Mix, ScalarKind, ThermalCoupled, Volumized};
pub use steam::{IsenthalpicExpansion, IsobaricIsochoric, SaturatedSeparation};
