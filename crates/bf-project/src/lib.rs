//! bf-project: initial-condition records and their registry.
//!
//! A record round-trips one element's persistent state under the element's
//! stable name; the registry collects the records of a whole network and
//! serializes to JSON or YAML.

pub mod record;
pub mod registry;

pub use record::StateRecord;
pub use registry::InitialConditions;
