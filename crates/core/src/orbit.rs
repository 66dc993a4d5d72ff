//! Orbit plan
//!
//! Validated parameters for one orbit maneuver and the quantities derived
//! from them: angular rate, expected period, circle deadline and the
//! convergence tolerance used when snapping back to the perimeter.
//!
//! ## Geometry
//!
//! The vehicle starts at the orbit center, translates sideways by the radius
//! (left for clockwise, right for counter-clockwise), yaws 90 degrees onto
//! the tangent and then flies forward while yawing at `v / r`.

use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;

use crate::setpoint::BodyAxis;

/// Orbit direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OrbitDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl OrbitDirection {
    /// Short command-line spelling ("cw" / "ccw").
    pub fn as_str(self) -> &'static str {
        match self {
            OrbitDirection::Clockwise => "cw",
            OrbitDirection::CounterClockwise => "ccw",
        }
    }
}

impl fmt::Display for OrbitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitDirection::Clockwise => f.write_str("CW"),
            OrbitDirection::CounterClockwise => f.write_str("CCW"),
        }
    }
}

/// Returned when a direction word is neither "cw" nor "ccw".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseDirectionError;

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("orbit direction must be 'cw' or 'ccw'")
    }
}

impl FromStr for OrbitDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cw") {
            Ok(OrbitDirection::Clockwise)
        } else if s.eq_ignore_ascii_case("ccw") {
            Ok(OrbitDirection::CounterClockwise)
        } else {
            Err(ParseDirectionError)
        }
    }
}

/// Parameters for one orbit, clamped to safe minimums on construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitPlan {
    /// Orbit radius in meters (>= 0.5)
    pub radius_m: f64,
    /// Orbit direction
    pub direction: OrbitDirection,
    /// Tangential speed in m/s (>= 0.2)
    pub tangential_speed_mps: f64,
    /// Fly back to the captured center after the perimeter correction
    pub return_to_center: bool,
}

impl OrbitPlan {
    /// Smallest accepted radius in meters
    pub const MIN_RADIUS_M: f64 = 0.5;
    /// Smallest accepted tangential speed in m/s
    pub const MIN_SPEED_MPS: f64 = 0.2;
    /// Sweep that counts as one full orbit
    pub const FULL_TURN_DEG: f64 = 360.0;
    /// Yaw that puts the nose on the tangent after the perimeter transit
    pub const ALIGNMENT_DEG: f64 = 90.0;
    /// Circle phase deadline as a multiple of the expected period
    pub const DEFAULT_DEADLINE_FACTOR: f64 = 1.35;
    /// Convergence tolerance floor in meters
    pub const DEFAULT_TOLERANCE_FLOOR_M: f64 = 0.6;
    /// Convergence tolerance as a fraction of the radius
    pub const DEFAULT_TOLERANCE_FACTOR: f64 = 0.12;

    /// Build a plan, clamping radius and speed to their minimums.
    ///
    /// Non-finite inputs clamp to the minimum as well.
    pub fn new(
        radius_m: f64,
        direction: OrbitDirection,
        tangential_speed_mps: f64,
        return_to_center: bool,
    ) -> Self {
        Self {
            radius_m: clamp_min(radius_m, Self::MIN_RADIUS_M),
            direction,
            tangential_speed_mps: clamp_min(tangential_speed_mps, Self::MIN_SPEED_MPS),
            return_to_center,
        }
    }

    /// Unsigned angular rate `degrees(v / r)`.
    pub fn angular_rate_deg_s(&self) -> f64 {
        (self.tangential_speed_mps / self.radius_m).to_degrees()
    }

    /// Yaw rate for the circle phase, signed by direction.
    ///
    /// Counter-clockwise orbits yaw at a negative rate, clockwise at a
    /// positive one.
    pub fn circle_yaw_rate_deg_s(&self) -> f64 {
        match self.direction {
            OrbitDirection::Clockwise => self.angular_rate_deg_s(),
            OrbitDirection::CounterClockwise => -self.angular_rate_deg_s(),
        }
    }

    /// Analytic period of one revolution, `2πr / v`.
    pub fn expected_period_s(&self) -> f64 {
        2.0 * PI * self.radius_m / self.tangential_speed_mps
    }

    /// Hard ceiling for the circle phase.
    pub fn circle_deadline_s(&self, factor: f64) -> f64 {
        self.expected_period_s() * factor
    }

    /// Distance under which the perimeter correction counts as converged.
    pub fn convergence_tolerance_m(&self, floor_m: f64, factor: f64) -> f64 {
        floor_m.max(self.radius_m * factor)
    }

    /// Sideways direction of the center-to-perimeter transit.
    pub fn transit_axis(&self) -> BodyAxis {
        match self.direction {
            OrbitDirection::Clockwise => BodyAxis::Left,
            OrbitDirection::CounterClockwise => BodyAxis::Right,
        }
    }

    /// Signed yaw for tangent alignment.
    pub fn alignment_yaw_deg(&self) -> f64 {
        match self.direction {
            OrbitDirection::Clockwise => -Self::ALIGNMENT_DEG,
            OrbitDirection::CounterClockwise => Self::ALIGNMENT_DEG,
        }
    }
}

fn clamp_min(value: f64, min: f64) -> f64 {
    if value.is_finite() {
        value.max(min)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_direction() {
        assert_eq!("cw".parse::<OrbitDirection>(), Ok(OrbitDirection::Clockwise));
        assert_eq!("CCW".parse::<OrbitDirection>(), Ok(OrbitDirection::CounterClockwise));
        assert_eq!("left".parse::<OrbitDirection>(), Err(ParseDirectionError));
    }

    #[test]
    fn test_plan_clamps_minimums() {
        let plan = OrbitPlan::new(0.1, OrbitDirection::Clockwise, 0.05, false);
        assert_eq!(plan.radius_m, OrbitPlan::MIN_RADIUS_M);
        assert_eq!(plan.tangential_speed_mps, OrbitPlan::MIN_SPEED_MPS);
    }

    #[test]
    fn test_plan_clamps_nan() {
        let plan = OrbitPlan::new(f64::NAN, OrbitDirection::Clockwise, f64::INFINITY, false);
        assert_eq!(plan.radius_m, OrbitPlan::MIN_RADIUS_M);
        assert_eq!(plan.tangential_speed_mps, OrbitPlan::MIN_SPEED_MPS);
    }

    #[test]
    fn test_ccw_ten_meter_orbit() {
        let plan = OrbitPlan::new(10.0, OrbitDirection::CounterClockwise, 1.5, false);
        assert!((plan.angular_rate_deg_s() - 8.594).abs() < 1e-3);
        assert!((plan.circle_yaw_rate_deg_s() + 8.594).abs() < 1e-3);
        assert!((plan.expected_period_s() - 41.888).abs() < 1e-3);
        assert_eq!(plan.transit_axis(), BodyAxis::Right);
        assert_eq!(plan.alignment_yaw_deg(), 90.0);
    }

    #[test]
    fn test_cw_orbit_geometry() {
        let plan = OrbitPlan::new(5.0, OrbitDirection::Clockwise, 1.0, true);
        assert_eq!(plan.transit_axis(), BodyAxis::Left);
        assert_eq!(plan.alignment_yaw_deg(), -90.0);
        assert!(plan.circle_yaw_rate_deg_s() > 0.0);
    }

    #[test]
    fn test_convergence_tolerance() {
        let small = OrbitPlan::new(2.0, OrbitDirection::Clockwise, 1.0, false);
        assert_eq!(small.convergence_tolerance_m(0.6, 0.12), 0.6);
        let large = OrbitPlan::new(10.0, OrbitDirection::Clockwise, 1.0, false);
        assert!((large.convergence_tolerance_m(0.6, 0.12) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_circle_deadline() {
        let plan = OrbitPlan::new(10.0, OrbitDirection::Clockwise, 1.5, false);
        let deadline = plan.circle_deadline_s(OrbitPlan::DEFAULT_DEADLINE_FACTOR);
        assert!((deadline - 1.35 * plan.expected_period_s()).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_derived_quantities(r in 0.5f64..500.0, v in 0.2f64..30.0) {
            let plan = OrbitPlan::new(r, OrbitDirection::CounterClockwise, v, false);
            prop_assert_eq!(plan.angular_rate_deg_s(), (v / r).to_degrees());
            prop_assert_eq!(plan.expected_period_s(), 2.0 * PI * r / v);
        }

        #[test]
        fn prop_rate_times_period_is_full_turn(r in 0.5f64..500.0, v in 0.2f64..30.0) {
            let plan = OrbitPlan::new(r, OrbitDirection::Clockwise, v, false);
            let sweep = plan.angular_rate_deg_s() * plan.expected_period_s();
            prop_assert!((sweep - 360.0).abs() < 1e-6);
        }
    }
}
