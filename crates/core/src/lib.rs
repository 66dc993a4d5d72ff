//! offboard_pilot_core - Pure no_std maneuver math for offboard_pilot
//!
//! This crate contains platform-agnostic algorithms and value types that
//! the maneuver engine builds on. Nothing here performs I/O or sleeps, so
//! everything can be tested on host without a runtime.
//!
//! # Design Principles
//!
//! - **Pure no_std**: No std library dependencies
//! - **Plain values**: Every type is `Copy` and owned by the caller
//!
//! # Modules
//!
//! - [`angle`]: Wraparound-safe heading deltas and yaw integration
//! - [`geo`]: Captured GPS fixes and great-circle distance
//! - [`orbit`]: Orbit plan validation and derived quantities
//! - [`setpoint`]: Body-frame velocity/yaw-rate setpoints
//! - [`action`]: Vehicle action result codes

#![no_std]

#[cfg(test)]
extern crate std;

pub mod action;
pub mod angle;
pub mod geo;
pub mod orbit;
pub mod setpoint;

pub use action::ActionResult;
pub use angle::{shortest_delta, wrap_360, HeadingAccumulator};
pub use geo::{haversine_distance, offset_position, GeoFix, EARTH_RADIUS_M};
pub use orbit::{OrbitDirection, OrbitPlan, ParseDirectionError};
pub use setpoint::{BodyAxis, VelocityBodyYawspeed};
