//! Five-phase orbit maneuver.
//!
//! # Phases
//!
//! 1. **CaptureCenter**: record the current fix as the orbit center
//! 2. **TransitToPerimeter**: translate sideways by the radius (left for
//!    CW, right for CCW) and record the perimeter start fix
//! 3. **TangentAlignment**: yaw 90° so the nose points along the path
//! 4. **Circle**: stream forward speed plus yaw rate while integrating the
//!    actual heading change; stop at 360° or at the circle deadline
//! 5. **PerimeterCorrection**: go-to the perimeter start fix and poll the
//!    distance until it is within tolerance or the wait times out
//!
//! An optional **ReturnToCenter** go-to follows when requested. Timeouts in
//! phases 4 and 5 are logged and reported, never raised.

use core::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{info, warn};

use offboard_pilot_core::{GeoFix, HeadingAccumulator, OrbitPlan, VelocityBodyYawspeed};

use crate::cancel::CancelToken;
use crate::error::ControlError;
use crate::link::VehicleLink;
use crate::maneuver::{checked_duration, continue_unless_cancelled, goto, translate, yaw_by};
use crate::session::VehicleSession;
use crate::streaming::{SetpointProgram, StreamOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitPhase {
    CaptureCenter,
    TransitToPerimeter,
    TangentAlignment,
    Circle,
    PerimeterCorrection,
    ReturnToCenter,
}

impl fmt::Display for OrbitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrbitPhase::CaptureCenter => "capture-center",
            OrbitPhase::TransitToPerimeter => "transit",
            OrbitPhase::TangentAlignment => "align",
            OrbitPhase::Circle => "circle",
            OrbitPhase::PerimeterCorrection => "correct",
            OrbitPhase::ReturnToCenter => "return",
        };
        f.write_str(text)
    }
}

/// Result of the circle phase.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleReport {
    /// Integrated heading change in degrees.
    pub swept_deg: f64,
    /// True if the full turn was integrated before the deadline.
    pub completed: bool,
    /// Progress percentages reported, in order.
    pub progress: Vec<u8>,
    pub elapsed: Duration,
}

/// Result of a distance-convergence wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convergence {
    Reached { distance_m: f64 },
    TimedOut { distance_m: f64 },
}

impl Convergence {
    pub fn distance_m(&self) -> f64 {
        match self {
            Convergence::Reached { distance_m } | Convergence::TimedOut { distance_m } => {
                *distance_m
            }
        }
    }

    pub fn is_reached(&self) -> bool {
        matches!(self, Convergence::Reached { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitReport {
    pub plan: OrbitPlan,
    pub center: GeoFix,
    pub perimeter_start: GeoFix,
    pub circle: CircleReport,
    pub correction: Convergence,
    pub returned_to_center: bool,
}

impl fmt::Display for OrbitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.returned_to_center {
            f.write_str("Orbit complete (returning to center)")
        } else {
            f.write_str("Orbit complete (back at start-perimeter)")
        }
    }
}

/// Streams the circle setpoint and integrates heading after every tick.
pub struct CircleProgram {
    setpoint: VelocityBodyYawspeed,
    heading: HeadingAccumulator,
    progress: Vec<u8>,
}

impl CircleProgram {
    pub fn new(plan: &OrbitPlan, initial_heading_deg: f64) -> Self {
        Self {
            setpoint: VelocityBodyYawspeed::new(
                plan.tangential_speed_mps,
                0.0,
                0.0,
                plan.circle_yaw_rate_deg_s(),
            ),
            heading: HeadingAccumulator::seeded(OrbitPlan::FULL_TURN_DEG, initial_heading_deg),
            progress: Vec::new(),
        }
    }

    pub fn swept_deg(&self) -> f64 {
        self.heading.total_deg()
    }
}

#[async_trait]
impl SetpointProgram for CircleProgram {
    fn setpoint(&self) -> VelocityBodyYawspeed {
        self.setpoint
    }

    async fn observe(&mut self, link: &dyn VehicleLink) -> Result<bool, ControlError> {
        let attitude = link.attitude().await.map_err(ControlError::Telemetry)?;
        if let Some(percent) = self.heading.update(attitude.yaw_deg) {
            info!("Circle {}%", percent);
            self.progress.push(percent);
        }
        Ok(self.heading.is_complete())
    }
}

/// Poll the distance to `target` until it drops below `tolerance_m` or
/// `timeout` elapses. A timeout is logged and returned, not raised.
pub async fn wait_for_convergence(
    link: &dyn VehicleLink,
    cancel: &CancelToken,
    target: &GeoFix,
    tolerance_m: f64,
    timeout: Duration,
    poll: Duration,
) -> Result<Convergence, ControlError> {
    let start = Instant::now();
    loop {
        let position = link.position().await.map_err(ControlError::Telemetry)?;
        let distance_m = GeoFix::from(&position).distance_to(target);
        if distance_m < tolerance_m {
            return Ok(Convergence::Reached { distance_m });
        }
        if start.elapsed() >= timeout {
            warn!("Couldn't converge closer than {:.1} m", distance_m);
            return Ok(Convergence::TimedOut { distance_m });
        }
        if cancel.sleep_until(Instant::now() + poll).await {
            return Err(ControlError::Cancelled);
        }
    }
}

/// Run all orbit phases.
pub async fn run(
    session: &VehicleSession,
    cancel: &CancelToken,
    plan: OrbitPlan,
) -> Result<OrbitReport, ControlError> {
    session.ensure_connected().await?;
    let config = session.config();
    info!(
        "Orbit r={:.1}m dir={} v={:.2}m/s",
        plan.radius_m, plan.direction, plan.tangential_speed_mps
    );

    enter(OrbitPhase::CaptureCenter, cancel)?;
    let center = GeoFix::from(session.position().await?);

    enter(OrbitPhase::TransitToPerimeter, cancel)?;
    translate(session, cancel, plan.transit_axis(), plan.radius_m).await?;
    let perimeter_start = GeoFix::from(session.position().await?);

    enter(OrbitPhase::TangentAlignment, cancel)?;
    yaw_by(session, cancel, plan.alignment_yaw_deg()).await?;

    enter(OrbitPhase::Circle, cancel)?;
    let circle = circle(session, cancel, &plan).await?;

    enter(OrbitPhase::PerimeterCorrection, cancel)?;
    goto(
        session,
        perimeter_start.lat_deg,
        perimeter_start.lon_deg,
        Some(perimeter_start.abs_alt_m),
    )
    .await?;
    let tolerance_m =
        plan.convergence_tolerance_m(config.convergence_floor_m, config.convergence_radius_factor);
    let correction = wait_for_convergence(
        session.link(),
        cancel,
        &perimeter_start,
        tolerance_m,
        config.convergence_timeout(),
        config.convergence_poll(),
    )
    .await?;

    if plan.return_to_center {
        enter(OrbitPhase::ReturnToCenter, cancel)?;
        goto(
            session,
            center.lat_deg,
            center.lon_deg,
            Some(center.abs_alt_m),
        )
        .await?;
    }

    Ok(OrbitReport {
        plan,
        center,
        perimeter_start,
        circle,
        correction,
        returned_to_center: plan.return_to_center,
    })
}

fn enter(phase: OrbitPhase, cancel: &CancelToken) -> Result<(), ControlError> {
    if cancel.is_cancelled() {
        return Err(ControlError::Cancelled);
    }
    info!(%phase, "Orbit phase");
    Ok(())
}

async fn circle(
    session: &VehicleSession,
    cancel: &CancelToken,
    plan: &OrbitPlan,
) -> Result<CircleReport, ControlError> {
    let config = session.config();
    let initial = session.attitude().await?;
    let mut program = CircleProgram::new(plan, initial.yaw_deg);
    let limit = checked_duration(
        "Circle deadline",
        plan.circle_deadline_s(config.circle_deadline_factor),
    )?;
    info!(
        "Circle: target 360°, expected ~{:.1}s",
        plan.expected_period_s()
    );

    let started = Instant::now();
    let outcome = session
        .streaming(cancel.clone())
        .stream(&mut program, limit)
        .await?;
    let outcome = continue_unless_cancelled(outcome)?;

    let completed = outcome == StreamOutcome::Satisfied;
    if !completed {
        warn!(
            "Circle deadline reached after {:.0}° of 360°",
            program.swept_deg()
        );
    }
    Ok(CircleReport {
        swept_deg: program.swept_deg(),
        completed,
        progress: program.progress,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use offboard_pilot_core::OrbitDirection;

    #[test]
    fn test_circle_setpoint_ccw() {
        let plan = OrbitPlan::new(10.0, OrbitDirection::CounterClockwise, 1.5, false);
        let program = CircleProgram::new(&plan, 0.0);
        let sp = program.setpoint();
        assert_eq!(sp.forward_m_s, 1.5);
        assert!((sp.yawspeed_deg_s + 8.594).abs() < 1e-3);
    }

    #[test]
    fn test_convergence_accessors() {
        let c = Convergence::TimedOut { distance_m: 5.0 };
        assert!(!c.is_reached());
        assert_eq!(c.distance_m(), 5.0);
    }

    #[test]
    fn test_report_display() {
        let plan = OrbitPlan::new(10.0, OrbitDirection::Clockwise, 1.5, false);
        let report = OrbitReport {
            plan,
            center: GeoFix::default(),
            perimeter_start: GeoFix::default(),
            circle: CircleReport {
                swept_deg: 360.0,
                completed: true,
                progress: vec![25, 50, 75, 100],
                elapsed: Duration::from_secs(42),
            },
            correction: Convergence::Reached { distance_m: 0.2 },
            returned_to_center: false,
        };
        assert_eq!(report.to_string(), "Orbit complete (back at start-perimeter)");
    }
}
