//! Maneuver library.
//!
//! Each [`Maneuver`] runs as the session's single background task. Motion
//! maneuvers are built from [`StreamingTask`](crate::streaming::StreamingTask)
//! runs; actions (go-to, takeoff, land, RTL) call the link directly.

pub mod gimbal;
pub mod orbit;

use core::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use offboard_pilot_core::{BodyAxis, GeoFix, OrbitPlan, VelocityBodyYawspeed};

use crate::cancel::CancelToken;
use crate::error::ControlError;
use crate::session::VehicleSession;
use crate::streaming::{ConstantSetpoint, StreamOutcome};

pub use orbit::{Convergence, OrbitPhase, OrbitReport};

const TAKEOFF_POLL: Duration = Duration::from_millis(100);
const LAND_POLL: Duration = Duration::from_millis(300);
const MIN_TAKEOFF_M: f64 = 0.3;

/// A unit of work run through [`VehicleSession::launch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Maneuver {
    /// Body-frame translation at the configured linear speed.
    Translate { axis: BodyAxis, distance_m: f64 },
    /// Relative yaw. Positive comes from the `yaw_left`/`turn_ccw` aliases
    /// and is sent as a positive NED yaw rate (heading increases).
    Yaw { degrees: f64 },
    /// Go-to; altitude defaults to the current absolute altitude.
    Goto {
        lat_deg: f64,
        lon_deg: f64,
        abs_alt_m: Option<f64>,
    },
    Orbit(OrbitPlan),
    Takeoff { altitude_m: Option<f64> },
    Land,
    ReturnToLaunch,
    /// Cancel motion and hold position.
    Hold,
}

impl Maneuver {
    /// Short description used in status lines.
    pub fn label(&self) -> String {
        match self {
            Maneuver::Translate { axis, distance_m } => format!("{axis} {distance_m:.2}m"),
            Maneuver::Yaw { degrees } => format!(
                "yaw {} {:.1}°",
                if *degrees >= 0.0 { "CCW" } else { "CW" },
                degrees.abs()
            ),
            Maneuver::Goto {
                lat_deg, lon_deg, ..
            } => format!("goto {lat_deg:.6}, {lon_deg:.6}"),
            Maneuver::Orbit(plan) => format!(
                "orbit r={:.1}m dir={} v={:.2}m/s",
                plan.radius_m, plan.direction, plan.tangential_speed_mps
            ),
            Maneuver::Takeoff { .. } => "takeoff".to_string(),
            Maneuver::Land => "land".to_string(),
            Maneuver::ReturnToLaunch => "rtl".to_string(),
            Maneuver::Hold => "stop".to_string(),
        }
    }

    pub async fn execute(
        self,
        session: &VehicleSession,
        cancel: &CancelToken,
    ) -> Result<ManeuverReport, ControlError> {
        match self {
            Maneuver::Translate { axis, distance_m } => {
                if !(distance_m.is_finite() && distance_m > 0.0) {
                    return Ok(ManeuverReport::Skipped {
                        reason: "Distance must be > 0.",
                    });
                }
                translate(session, cancel, axis, distance_m).await?;
                Ok(ManeuverReport::Moved { axis, distance_m })
            }
            Maneuver::Yaw { degrees } => {
                yaw_by(session, cancel, degrees).await?;
                Ok(ManeuverReport::Yawed { degrees })
            }
            Maneuver::Goto {
                lat_deg,
                lon_deg,
                abs_alt_m,
            } => {
                let target = goto(session, lat_deg, lon_deg, abs_alt_m).await?;
                Ok(ManeuverReport::Enroute { target })
            }
            Maneuver::Orbit(plan) => Ok(ManeuverReport::Orbit(
                orbit::run(session, cancel, plan).await?,
            )),
            Maneuver::Takeoff { altitude_m } => takeoff(session, cancel, altitude_m).await,
            Maneuver::Land => land(session, cancel).await,
            Maneuver::ReturnToLaunch => {
                session.ensure_connected().await?;
                session.stop_offboard_if_active().await;
                session
                    .link()
                    .return_to_launch()
                    .await
                    .map_err(|e| ControlError::action("rtl", e))?;
                Ok(ManeuverReport::ReturningToLaunch)
            }
            Maneuver::Hold => {
                session.ensure_connected().await?;
                // The previous task has already drained; this only catches a
                // session left active by an aborted task.
                session.streaming(cancel.clone()).drain_and_release().await;
                Ok(ManeuverReport::Holding)
            }
        }
    }
}

/// Outcome of a completed maneuver.
#[derive(Debug, Clone, PartialEq)]
pub enum ManeuverReport {
    /// Rejected before any motion.
    Skipped { reason: &'static str },
    Moved { axis: BodyAxis, distance_m: f64 },
    Yawed { degrees: f64 },
    Enroute { target: GeoFix },
    Orbit(OrbitReport),
    Takeoff { altitude_m: f64, reached: bool },
    Landed { touched_down: bool, disarmed: bool },
    ReturningToLaunch,
    Holding,
}

impl fmt::Display for ManeuverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManeuverReport::Skipped { reason } => f.write_str(reason),
            ManeuverReport::Moved { .. } => f.write_str("Move done"),
            ManeuverReport::Yawed { .. } => f.write_str("Yaw done"),
            ManeuverReport::Enroute { target } => write!(
                f,
                "Enroute to {:.6}, {:.6} @ {:.1}m (abs)",
                target.lat_deg, target.lon_deg, target.abs_alt_m
            ),
            ManeuverReport::Orbit(report) => report.fmt(f),
            ManeuverReport::Takeoff {
                altitude_m,
                reached: true,
            } => write!(f, "Takeoff complete: {altitude_m:.1} m"),
            ManeuverReport::Takeoff {
                altitude_m,
                reached: false,
            } => write!(f, "Takeoff commanded, {altitude_m:.1} m not yet reached"),
            ManeuverReport::Landed {
                touched_down: true,
                disarmed: true,
            } => f.write_str("Landed and disarmed"),
            ManeuverReport::Landed {
                touched_down: true,
                disarmed: false,
            } => f.write_str("Landed (disarm refused)"),
            ManeuverReport::Landed {
                touched_down: false,
                ..
            } => f.write_str("Landing in progress"),
            ManeuverReport::ReturningToLaunch => f.write_str("RTL initiated"),
            ManeuverReport::Holding => f.write_str("Holding"),
        }
    }
}

/// Map a cancelled stream to an error so multi-phase maneuvers stop early.
pub(crate) fn continue_unless_cancelled(
    outcome: StreamOutcome,
) -> Result<StreamOutcome, ControlError> {
    match outcome {
        StreamOutcome::Cancelled => Err(ControlError::Cancelled),
        other => Ok(other),
    }
}

/// Seconds as a timer duration. Values that cannot be scheduled from now,
/// including negative or non-finite ones, are refused.
pub(crate) fn checked_duration(what: &'static str, secs: f64) -> Result<Duration, ControlError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| Instant::now().checked_add(*d).is_some())
        .ok_or(ControlError::OutOfRange(what))
}

/// Translate `distance_m` along `axis` at the configured linear speed.
pub async fn translate(
    session: &VehicleSession,
    cancel: &CancelToken,
    axis: BodyAxis,
    distance_m: f64,
) -> Result<StreamOutcome, ControlError> {
    session.ensure_connected().await?;
    let speed = session.config().linear_speed_mps.abs().max(1e-3);
    let duration = checked_duration("Move duration", distance_m.max(0.0) / speed)?;
    info!("Move {} {:.2}m for {:.2}s", axis, distance_m, duration.as_secs_f64());

    let mut program = ConstantSetpoint(VelocityBodyYawspeed::along(axis, speed));
    let outcome = session
        .streaming(cancel.clone())
        .stream(&mut program, duration)
        .await?;
    continue_unless_cancelled(outcome)
}

/// Rotate by `degrees`; the sign selects the direction.
pub async fn yaw_by(
    session: &VehicleSession,
    cancel: &CancelToken,
    degrees: f64,
) -> Result<StreamOutcome, ControlError> {
    session.ensure_connected().await?;
    let rate = session.config().yaw_rate_deg_s.abs().max(1e-3);
    let signed_rate = if degrees >= 0.0 { rate } else { -rate };
    let duration = checked_duration("Yaw duration", degrees.abs() / rate)?;
    info!(
        "Yaw {} {:.1}° at {:.1}°/s",
        if degrees >= 0.0 { "CCW" } else { "CW" },
        degrees.abs(),
        rate
    );

    let mut program = ConstantSetpoint(VelocityBodyYawspeed::yaw(signed_rate));
    let outcome = session
        .streaming(cancel.clone())
        .stream(&mut program, duration)
        .await?;
    continue_unless_cancelled(outcome)
}

/// Release offboard control and fly to the given position, keeping the
/// current heading. Returns once the target is accepted.
pub async fn goto(
    session: &VehicleSession,
    lat_deg: f64,
    lon_deg: f64,
    abs_alt_m: Option<f64>,
) -> Result<GeoFix, ControlError> {
    if !(lat_deg.is_finite() && lon_deg.is_finite() && abs_alt_m.map_or(true, f64::is_finite)) {
        return Err(ControlError::OutOfRange("Go-to target"));
    }
    session.ensure_connected().await?;
    session.stop_offboard_if_active().await;

    let position = session.position().await?;
    let attitude = session.attitude().await?;
    let target = GeoFix::new(lat_deg, lon_deg, abs_alt_m.unwrap_or(position.abs_alt_m));
    info!(
        "Goto {:.6}, {:.6} @ {:.1}m (abs)",
        target.lat_deg, target.lon_deg, target.abs_alt_m
    );
    session
        .link()
        .goto_location(target, attitude.yaw_deg)
        .await
        .map_err(|e| ControlError::action("goto", e))?;
    Ok(target)
}

async fn takeoff(
    session: &VehicleSession,
    cancel: &CancelToken,
    altitude_m: Option<f64>,
) -> Result<ManeuverReport, ControlError> {
    session.ensure_connected().await?;
    session.ensure_armed().await?;

    let config = session.config();
    let target = match altitude_m {
        Some(alt) if alt > MIN_TAKEOFF_M => alt,
        _ => config.default_takeoff_m,
    };
    info!("Takeoff to {:.1} m", target);

    let link = session.link();
    link.set_takeoff_altitude(target)
        .await
        .map_err(|e| ControlError::action("takeoff", e))?;
    link.takeoff()
        .await
        .map_err(|e| ControlError::action("takeoff", e))?;

    let deadline = Instant::now() + config.takeoff_timeout();
    loop {
        let position = session.position().await?;
        if position.rel_alt_m >= config.takeoff_reached_fraction * target {
            return Ok(ManeuverReport::Takeoff {
                altitude_m: target,
                reached: true,
            });
        }
        if Instant::now() >= deadline {
            warn!(
                "Takeoff altitude not reached: {:.1} of {:.1} m",
                position.rel_alt_m, target
            );
            return Ok(ManeuverReport::Takeoff {
                altitude_m: target,
                reached: false,
            });
        }
        if cancel.sleep_until(Instant::now() + TAKEOFF_POLL).await {
            return Err(ControlError::Cancelled);
        }
    }
}

async fn land(
    session: &VehicleSession,
    cancel: &CancelToken,
) -> Result<ManeuverReport, ControlError> {
    session.ensure_connected().await?;
    session.stop_offboard_if_active().await;

    let link = session.link();
    link.land()
        .await
        .map_err(|e| ControlError::action("land", e))?;

    let deadline = Instant::now() + session.config().land_timeout();
    let touched_down = loop {
        if !link.in_air().await.map_err(ControlError::Telemetry)? {
            break true;
        }
        if Instant::now() >= deadline {
            warn!("Still in air after land timeout");
            break false;
        }
        if cancel.sleep_until(Instant::now() + LAND_POLL).await {
            return Err(ControlError::Cancelled);
        }
    };

    let disarmed = if touched_down {
        match link.disarm().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Disarm after landing failed: {}", e);
                false
            }
        }
    } else {
        false
    };
    Ok(ManeuverReport::Landed {
        touched_down,
        disarmed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_checked_duration() {
        assert_eq!(
            checked_duration("Move duration", 2.5).unwrap(),
            Duration::from_millis(2500)
        );
        for secs in [1e300, f64::INFINITY, f64::NAN, -1.0, 1e19] {
            let err = checked_duration("Move duration", secs).unwrap_err();
            assert_eq!(err.to_string(), "Move duration out of range", "{secs}");
        }
    }
}
