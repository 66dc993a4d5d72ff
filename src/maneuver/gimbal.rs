//! Camera gimbal pointing with capability fallback.
//!
//! Strategies are tried in order; each is gated by a capability probe. When
//! none applies the caller gets [`GimbalOutcome::Unavailable`] and prints
//! guidance. Missing gimbal support is never an error.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ControlError;
use crate::link::{Capability, CapabilitySupport, VehicleLink};
use crate::maneuver::checked_duration;
use crate::session::VehicleSession;

/// Pitch rate used by the rate strategy, deg/s.
pub const GIMBAL_RATE_DEG_S: f64 = 60.0;
/// Relative altitude below which ground-looking is discouraged.
pub const LOOK_DOWN_MIN_ALT_M: f64 = 3.8;
/// Duration of the rate nudge back to level.
const LEVEL_NUDGE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GimbalStrategy {
    Angle,
    Rate,
}

impl GimbalStrategy {
    pub const ORDER: [GimbalStrategy; 2] = [GimbalStrategy::Angle, GimbalStrategy::Rate];

    fn capability(self) -> Capability {
        match self {
            GimbalStrategy::Angle => Capability::GimbalAngle,
            GimbalStrategy::Rate => Capability::GimbalRate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GimbalOutcome {
    AngleSet,
    RateApplied,
    Unavailable,
}

impl GimbalOutcome {
    fn from_strategy(strategy: GimbalStrategy) -> Self {
        match strategy {
            GimbalStrategy::Angle => GimbalOutcome::AngleSet,
            GimbalStrategy::Rate => GimbalOutcome::RateApplied,
        }
    }
}

/// Pitch the gimbal down by `degrees`.
pub async fn look_down(
    session: &VehicleSession,
    degrees: f64,
) -> Result<GimbalOutcome, ControlError> {
    session.ensure_connected().await?;
    let position = session.position().await?;
    if position.rel_alt_m < LOOK_DOWN_MIN_ALT_M {
        warn!(
            "Alt {:.1} m; consider >4 m for ground-looking",
            position.rel_alt_m
        );
    }
    let yaw_deg = session.attitude().await?.yaw_deg;
    let pitch_deg = -degrees.abs();
    let sweep = checked_duration("Gimbal sweep", degrees.abs() / GIMBAL_RATE_DEG_S)?;

    Ok(point(session.link(), pitch_deg, yaw_deg, -GIMBAL_RATE_DEG_S, sweep).await)
}

/// Return the gimbal to level.
pub async fn look_forward(session: &VehicleSession) -> Result<GimbalOutcome, ControlError> {
    session.ensure_connected().await?;
    let yaw_deg = session.attitude().await?.yaw_deg;
    Ok(point(session.link(), 0.0, yaw_deg, GIMBAL_RATE_DEG_S, LEVEL_NUDGE).await)
}

async fn point(
    link: &dyn VehicleLink,
    pitch_deg: f64,
    yaw_deg: f64,
    pitch_rate_deg_s: f64,
    sweep: Duration,
) -> GimbalOutcome {
    for strategy in GimbalStrategy::ORDER {
        let capability = strategy.capability();
        match link.probe(capability).await {
            CapabilitySupport::Supported => {}
            CapabilitySupport::Unsupported => {
                debug!("{} unsupported", capability.name());
                continue;
            }
            CapabilitySupport::Error(reason) => {
                warn!("{} probe failed: {}", capability.name(), reason);
                continue;
            }
        }

        let applied = match strategy {
            GimbalStrategy::Angle => link.set_gimbal_angle(pitch_deg, yaw_deg).await,
            GimbalStrategy::Rate => apply_rate(link, pitch_rate_deg_s, sweep).await,
        };
        match applied {
            Ok(()) => return GimbalOutcome::from_strategy(strategy),
            Err(e) => warn!("{} failed: {}", capability.name(), e),
        }
    }
    GimbalOutcome::Unavailable
}

async fn apply_rate(
    link: &dyn VehicleLink,
    pitch_rate_deg_s: f64,
    sweep: Duration,
) -> Result<(), crate::error::LinkError> {
    link.set_gimbal_rate(pitch_rate_deg_s, 0.0).await?;
    tokio::time::sleep(sweep).await;
    link.set_gimbal_rate(0.0, 0.0).await
}
