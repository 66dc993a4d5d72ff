//! offboard_pilot - Closed-loop offboard maneuvers for MAVLink multicopters
//!
//! Issues motion commands to a vehicle over a command/telemetry link and
//! executes maneuvers built from streamed body-frame velocity setpoints.
//!
//! # Layers
//!
//! - [`link`]: the vehicle link trait, a MAVLink/UDP implementation and a
//!   built-in simulated vehicle
//! - [`session`]: the single owned session (connect/arm guards, offboard
//!   state, one active background task)
//! - [`streaming`]: fixed-cadence setpoint streaming with a guaranteed
//!   settle-and-release on every exit path
//! - [`maneuver`]: translations, yaw, go-to, takeoff/land/RTL, the orbit
//!   state machine and gimbal pointing
//! - [`command`] and [`console`]: the textual command surface
//!
//! Pure math (angles, distances, orbit geometry) lives in
//! `offboard_pilot_core`.

pub mod cancel;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod link;
pub mod maneuver;
pub mod session;
pub mod streaming;
pub mod types;

pub use cancel::{CancelSource, CancelToken};
pub use command::{Command, ParseCommandError};
pub use config::{ConfigError, ControllerConfig};
pub use console::{Console, ConsoleFlow};
pub use error::{ControlError, LinkError};
pub use link::{MavlinkLink, SimulatedVehicle, VehicleLink};
pub use maneuver::{Maneuver, ManeuverReport};
pub use session::{ControlMode, ManeuverHandle, VehicleSession};
pub use streaming::{SetpointProgram, StreamOutcome, StreamingTask};
pub use types::VehicleSnapshot;
