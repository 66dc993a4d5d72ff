//! Offboard setpoint types

use core::fmt;

/// One offboard setpoint: body-frame velocity plus yaw rate.
///
/// Axes follow the vehicle body frame (forward, right, down) and the yaw
/// rate follows the same NED convention: positive `yawspeed_deg_s` turns the
/// nose clockwise seen from above, so heading increases.
///
/// The command aliases `yaw_left`, `turn_ccw` and `look_left` map to a
/// positive rate and therefore turn the vehicle clockwise in this frame;
/// the `CCW` wording in their status lines names the alias, not the
/// physical rotation.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct VelocityBodyYawspeed {
    /// Forward velocity in m/s
    pub forward_m_s: f64,
    /// Rightward velocity in m/s
    pub right_m_s: f64,
    /// Downward velocity in m/s
    pub down_m_s: f64,
    /// Yaw rate in deg/s
    pub yawspeed_deg_s: f64,
}

impl VelocityBodyYawspeed {
    /// All-zero setpoint used for priming and settling.
    pub const ZERO: Self = Self {
        forward_m_s: 0.0,
        right_m_s: 0.0,
        down_m_s: 0.0,
        yawspeed_deg_s: 0.0,
    };

    pub fn new(forward_m_s: f64, right_m_s: f64, down_m_s: f64, yawspeed_deg_s: f64) -> Self {
        Self {
            forward_m_s,
            right_m_s,
            down_m_s,
            yawspeed_deg_s,
        }
    }

    /// Constant translation along a body axis.
    pub fn along(axis: BodyAxis, speed_m_s: f64) -> Self {
        let (f, r, d) = axis.unit();
        Self::new(f * speed_m_s, r * speed_m_s, d * speed_m_s, 0.0)
    }

    /// Pure rotation in place.
    pub fn yaw(yawspeed_deg_s: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, yawspeed_deg_s)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Body axis for linear translations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyAxis {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl BodyAxis {
    /// Unit vector in (forward, right, down) components.
    ///
    /// Up is negative down (NED convention).
    pub fn unit(self) -> (f64, f64, f64) {
        match self {
            BodyAxis::Forward => (1.0, 0.0, 0.0),
            BodyAxis::Backward => (-1.0, 0.0, 0.0),
            BodyAxis::Left => (0.0, -1.0, 0.0),
            BodyAxis::Right => (0.0, 1.0, 0.0),
            BodyAxis::Up => (0.0, 0.0, -1.0),
            BodyAxis::Down => (0.0, 0.0, 1.0),
        }
    }

    /// Command word for this axis.
    pub fn name(self) -> &'static str {
        match self {
            BodyAxis::Forward => "forward",
            BodyAxis::Backward => "backward",
            BodyAxis::Left => "left",
            BodyAxis::Right => "right",
            BodyAxis::Up => "up",
            BodyAxis::Down => "down",
        }
    }
}

impl fmt::Display for BodyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
