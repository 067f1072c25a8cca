//! bf-controls: control-side toolkit for bondflow models.
//!
//! Operates alongside the network engine on plain scalar signals: threshold
//! monitoring with prioritized alarm states, P/PID controllers with
//! anti-windup, setpoint ramping, a time-series vault for recorded
//! variables, and a named parameter handler.
//!
//! Nothing in here touches the network arena; a simulation harness samples
//! network quantities and feeds them through these blocks.

pub mod alarm;
pub mod controller;
pub mod error;
pub mod parameter;
pub mod setpoint;
pub mod vault;

pub use alarm::{AlarmManager, AlarmState, ThresholdMonitor, Thresholds};
pub use controller::{PController, PIDController, PIDControllerState};
pub use error::{ControlError, ControlResult};
pub use parameter::ParameterHandler;
pub use setpoint::SetpointIntegrator;
pub use vault::TimeSeriesVault;
