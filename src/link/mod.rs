//! Vehicle link abstraction.
//!
//! All telemetry reads and vehicle commands go through [`VehicleLink`].
//! Two implementations ship with the crate:
//!
//! - [`MavlinkLink`]: MAVLink v2 over UDP to a PX4 autopilot
//! - [`SimulatedVehicle`]: built-in multicopter kinematics for `--sim` and tests
//!
//! Methods take `&self` so one link can be shared as `Arc<dyn VehicleLink>`
//! between the session and its background task.

pub mod capabilities;
pub mod mavlink;
pub mod sim;

use async_trait::async_trait;

pub use capabilities::{Capability, CapabilitySupport};
pub use self::mavlink::{LinkAddress, MavlinkLink, MavlinkSettings};
pub use sim::{SimConfig, SimulatedVehicle};

use offboard_pilot_core::{GeoFix, VelocityBodyYawspeed};

use crate::error::LinkError;
use crate::types::{Attitude, Battery, FlightMode, GpsInfo, Health, Position};

/// Command and telemetry channel to one vehicle.
#[async_trait]
pub trait VehicleLink: Send + Sync {
    /// Identifier for this link type (e.g., "mavlink", "sim").
    fn link_type(&self) -> &'static str;

    /// Open the link. Calling it again on an open link is a no-op.
    async fn connect(&self) -> Result<(), LinkError>;

    /// True once the vehicle has been discovered.
    fn is_connected(&self) -> bool;

    async fn health(&self) -> Result<Health, LinkError>;

    async fn position(&self) -> Result<Position, LinkError>;

    async fn attitude(&self) -> Result<Attitude, LinkError>;

    async fn armed(&self) -> Result<bool, LinkError>;

    async fn in_air(&self) -> Result<bool, LinkError>;

    async fn battery(&self) -> Result<Battery, LinkError>;

    async fn gps_info(&self) -> Result<GpsInfo, LinkError>;

    async fn flight_mode(&self) -> Result<FlightMode, LinkError>;

    async fn arm(&self) -> Result<(), LinkError>;

    async fn disarm(&self) -> Result<(), LinkError>;

    /// Altitude above home used by the next [`takeoff`](Self::takeoff).
    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<(), LinkError>;

    async fn takeoff(&self) -> Result<(), LinkError>;

    async fn land(&self) -> Result<(), LinkError>;

    async fn return_to_launch(&self) -> Result<(), LinkError>;

    /// Fly to an absolute position. Returns once the vehicle accepted the
    /// target, not when it arrives.
    async fn goto_location(&self, target: GeoFix, yaw_deg: f64) -> Result<(), LinkError>;

    /// Enter offboard mode. A setpoint must have been sent first.
    async fn start_offboard(&self) -> Result<(), LinkError>;

    async fn stop_offboard(&self) -> Result<(), LinkError>;

    /// Send one body-frame velocity setpoint.
    async fn set_velocity_body(&self, setpoint: VelocityBodyYawspeed) -> Result<(), LinkError>;

    /// Check whether an optional feature is available.
    async fn probe(&self, capability: Capability) -> CapabilitySupport;

    async fn set_gimbal_angle(&self, pitch_deg: f64, yaw_deg: f64) -> Result<(), LinkError>;

    async fn set_gimbal_rate(&self, pitch_rate_deg_s: f64, yaw_rate_deg_s: f64)
        -> Result<(), LinkError>;
}
