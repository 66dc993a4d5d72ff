//! Textual command parsing.
//!
//! One line of input maps to one [`Command`]. Parsing is pure; the console
//! turns commands into maneuvers and prints their status lines.

use core::fmt;
use std::str::FromStr;

use offboard_pilot_core::{BodyAxis, OrbitDirection, OrbitPlan};

use crate::config::ControllerConfig;
use crate::maneuver::Maneuver;

pub const HELP: &str = "\
Basic Commands:
  help                     - Show this help menu
  arm                      - Arm the vehicle
  disarm                   - Disarm the vehicle
  takeoff [altitude]       - Take off to altitude in meters (default: 3m)
  land                     - Land and disarm
  rtl                      - Return to launch position
  stop                     - Stop current movement (hover)
  status                   - Show vehicle status
  battery                  - Show battery % and voltage
  exit                     - Exit the program

Movement Commands:
  forward <distance>       - Move forward in meters
  backward <distance>      - Move backward in meters
  left <distance>          - Move left in meters
  right <distance>         - Move right in meters
  up <distance>            - Climb in meters
  down <distance>          - Descend in meters
  yaw_left <degrees>       - Rotate left
  yaw_right <degrees>      - Rotate right
  turn_cw <degrees>        - Turn clockwise
  turn_ccw <degrees>       - Turn counter-clockwise
  look_left <degrees>      - Alias for yaw_left
  look_right <degrees>     - Alias for yaw_right

Navigation Commands:
  goto <lat> <lon> [alt]   - Go to GPS coordinates (alt is absolute AMSL)

Orbit:
  orbit <radius_m> [ccw|cw] [speed_mps] [return]
      Full 360° around current position; ends at the same perimeter start point.
      Add 'return' to go back to the center afterward.

Gimbal:
  look_down [deg]          - Pitch gimbal down (default 90°), if supported
  look_forward             - Pitch gimbal to 0°, if supported
";

const GOTO_USAGE: &str = "Usage: goto <lat> <lon> [alt_abs_m]";
const ORBIT_USAGE: &str = "Usage: orbit <radius_m> [ccw|cw] [speed_mps] [return]";
const DEFAULT_LOOK_DOWN_DEG: f64 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Battery,
    Arm,
    Disarm,
    Takeoff {
        altitude_m: Option<f64>,
    },
    Land,
    ReturnToLaunch,
    Stop,
    Move {
        axis: BodyAxis,
        distance_m: f64,
    },
    /// Signed relative yaw; `yaw_left`/`turn_ccw`/`look_left` are positive,
    /// which is a positive NED yaw rate.
    Yaw {
        degrees: f64,
    },
    Goto {
        lat_deg: f64,
        lon_deg: f64,
        abs_alt_m: Option<f64>,
    },
    Orbit {
        radius_m: f64,
        direction: OrbitDirection,
        /// Falls back to the configured orbit speed.
        speed_mps: Option<f64>,
        return_to_center: bool,
    },
    LookDown {
        degrees: f64,
    },
    LookForward,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    Empty,
    Unknown(String),
    Usage(&'static str),
    InvalidArguments,
}

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCommandError::Empty => f.write_str("Empty command"),
            ParseCommandError::Unknown(_) => f.write_str("Unknown command. Type 'help'."),
            ParseCommandError::Usage(usage) => f.write_str(usage),
            ParseCommandError::InvalidArguments => {
                f.write_str("Invalid arguments. Type 'help' for usage.")
            }
        }
    }
}

impl std::error::Error for ParseCommandError {}

/// Finite numbers only; `inf` and `nan` parse as floats but are refused.
fn number(arg: Option<&&str>) -> Result<f64, ParseCommandError> {
    arg.ok_or(ParseCommandError::InvalidArguments)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ParseCommandError::InvalidArguments)
}

fn optional_number(arg: Option<&&str>) -> Result<Option<f64>, ParseCommandError> {
    arg.map(|a| number(Some(a))).transpose()
}

fn parse_orbit(args: &[&str]) -> Result<Command, ParseCommandError> {
    if args.is_empty() {
        return Err(ParseCommandError::Usage(ORBIT_USAGE));
    }
    let radius_m = number(args.first())?;

    // Positional and forgiving: an unrecognised direction or speed word
    // keeps the default rather than failing the command.
    let direction = args
        .get(1)
        .and_then(|a| a.parse::<OrbitDirection>().ok())
        .unwrap_or_default();
    let speed_mps = args
        .get(2)
        .and_then(|a| a.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0);
    let return_to_center =
        args.len() >= 2 && args.last().is_some_and(|a| a.eq_ignore_ascii_case("return"));

    Ok(Command::Orbit {
        radius_m,
        direction,
        speed_mps,
        return_to_center,
    })
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((word, args)) = parts.split_first() else {
            return Err(ParseCommandError::Empty);
        };
        let word = word.to_ascii_lowercase();

        let translate = |axis| -> Result<Command, ParseCommandError> {
            Ok(Command::Move {
                axis,
                distance_m: number(args.first())?,
            })
        };
        let yaw = |sign: f64| -> Result<Command, ParseCommandError> {
            Ok(Command::Yaw {
                degrees: sign * number(args.first())?,
            })
        };

        match word.as_str() {
            "help" => Ok(Command::Help),
            "status" => Ok(Command::Status),
            "battery" => Ok(Command::Battery),
            "arm" => Ok(Command::Arm),
            "disarm" => Ok(Command::Disarm),
            "takeoff" => Ok(Command::Takeoff {
                altitude_m: optional_number(args.first())?,
            }),
            "land" => Ok(Command::Land),
            "rtl" => Ok(Command::ReturnToLaunch),
            "stop" => Ok(Command::Stop),
            "forward" => translate(BodyAxis::Forward),
            "backward" => translate(BodyAxis::Backward),
            "left" => translate(BodyAxis::Left),
            "right" => translate(BodyAxis::Right),
            "up" => translate(BodyAxis::Up),
            "down" => translate(BodyAxis::Down),
            "yaw_left" | "turn_ccw" | "look_left" => yaw(1.0),
            "yaw_right" | "turn_cw" | "look_right" => yaw(-1.0),
            "goto" => {
                if args.len() < 2 {
                    return Err(ParseCommandError::Usage(GOTO_USAGE));
                }
                Ok(Command::Goto {
                    lat_deg: number(args.first())?,
                    lon_deg: number(args.get(1))?,
                    abs_alt_m: optional_number(args.get(2))?,
                })
            }
            "orbit" => parse_orbit(args),
            "look_down" => Ok(Command::LookDown {
                degrees: optional_number(args.first())?.unwrap_or(DEFAULT_LOOK_DOWN_DEG),
            }),
            "look_forward" => Ok(Command::LookForward),
            "exit" | "quit" => Ok(Command::Exit),
            _ => Err(ParseCommandError::Unknown(word)),
        }
    }
}

impl Command {
    /// Maneuver run in the background for this command, if any.
    pub fn maneuver(&self, config: &ControllerConfig) -> Option<Maneuver> {
        match *self {
            Command::Move { axis, distance_m } => Some(Maneuver::Translate { axis, distance_m }),
            Command::Yaw { degrees } => Some(Maneuver::Yaw { degrees }),
            Command::Goto {
                lat_deg,
                lon_deg,
                abs_alt_m,
            } => Some(Maneuver::Goto {
                lat_deg,
                lon_deg,
                abs_alt_m,
            }),
            Command::Orbit {
                radius_m,
                direction,
                speed_mps,
                return_to_center,
            } => Some(Maneuver::Orbit(OrbitPlan::new(
                radius_m,
                direction,
                speed_mps.unwrap_or(config.orbit_speed_mps),
                return_to_center,
            ))),
            Command::Takeoff { altitude_m } => Some(Maneuver::Takeoff { altitude_m }),
            Command::Land => Some(Maneuver::Land),
            Command::ReturnToLaunch => Some(Maneuver::ReturnToLaunch),
            Command::Stop => Some(Maneuver::Hold),
            _ => None,
        }
    }
}
