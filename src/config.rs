//! Controller configuration.
//!
//! Every policy constant used by the maneuver engine lives here. Values load
//! from an optional JSON file; missing keys fall back to the defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the maneuver engine and its vehicle link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Link address, e.g. `udpin:0.0.0.0:14540`.
    pub address: String,
    /// Setpoint streaming cadence in milliseconds.
    pub tick_ms: u64,
    /// Zero-velocity settle hold in seconds.
    pub settle_s: f64,
    /// Speed for body-frame translations in m/s.
    pub linear_speed_mps: f64,
    /// Rate for relative yaw maneuvers in deg/s.
    pub yaw_rate_deg_s: f64,
    /// Orbit tangential speed when none is given, m/s.
    pub orbit_speed_mps: f64,
    /// Takeoff altitude when none (or ≤ 0.3 m) is given.
    pub default_takeoff_m: f64,
    /// Fraction of target altitude that completes a takeoff.
    pub takeoff_reached_fraction: f64,
    /// Upper bound on waiting for takeoff altitude, seconds.
    pub takeoff_timeout_s: f64,
    /// Upper bound on waiting for touchdown, seconds.
    pub land_timeout_s: f64,
    /// Circle phase aborts after this multiple of the expected period.
    pub circle_deadline_factor: f64,
    /// Minimum perimeter convergence tolerance in meters.
    pub convergence_floor_m: f64,
    /// Convergence tolerance as a fraction of the orbit radius.
    pub convergence_radius_factor: f64,
    /// Polling period while waiting for convergence, seconds.
    pub convergence_poll_s: f64,
    /// Give up on perimeter convergence after this many seconds.
    pub convergence_timeout_s: f64,
    /// Upper bound on discovery and health checks, seconds.
    pub connect_timeout_s: f64,
    /// Command acknowledgement timeout, seconds.
    pub command_timeout_s: f64,
    /// Retransmissions before a command is reported as timed out.
    pub command_retries: u8,
    /// Upper bound on waiting for a telemetry value, seconds.
    pub telemetry_timeout_s: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            address: "udpin:0.0.0.0:14540".to_string(),
            tick_ms: 50,
            settle_s: 0.6,
            linear_speed_mps: 1.0,
            yaw_rate_deg_s: 30.0,
            orbit_speed_mps: 1.5,
            default_takeoff_m: 3.0,
            takeoff_reached_fraction: 0.92,
            takeoff_timeout_s: 30.0,
            land_timeout_s: 60.0,
            circle_deadline_factor: 1.35,
            convergence_floor_m: 0.6,
            convergence_radius_factor: 0.12,
            convergence_poll_s: 0.3,
            convergence_timeout_s: 12.0,
            connect_timeout_s: 30.0,
            command_timeout_s: 1.0,
            command_retries: 3,
            telemetry_timeout_s: 3.0,
        }
    }
}

impl ControllerConfig {
    /// Load from a JSON file. Keys absent from the file keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn settle(&self) -> Duration {
        secs(self.settle_s)
    }

    pub fn convergence_poll(&self) -> Duration {
        secs(self.convergence_poll_s)
    }

    pub fn convergence_timeout(&self) -> Duration {
        secs(self.convergence_timeout_s)
    }

    pub fn takeoff_timeout(&self) -> Duration {
        secs(self.takeoff_timeout_s)
    }

    pub fn land_timeout(&self) -> Duration {
        secs(self.land_timeout_s)
    }

    pub fn connect_timeout(&self) -> Duration {
        secs(self.connect_timeout_s)
    }

    pub fn command_timeout(&self) -> Duration {
        secs(self.command_timeout_s)
    }

    pub fn telemetry_timeout(&self) -> Duration {
        secs(self.telemetry_timeout_s)
    }
}

/// Negative, non-finite and unrepresentable values collapse to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.tick(), Duration::from_millis(50));
        assert_eq!(config.settle(), Duration::from_millis(600));
        assert_eq!(config.convergence_timeout(), Duration::from_secs(12));
        assert_eq!(config.convergence_poll(), Duration::from_millis(300));
        assert_eq!(config.circle_deadline_factor, 1.35);
        assert_eq!(config.address, "udpin:0.0.0.0:14540");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ControllerConfig::from_json(r#"{ "linear_speed_mps": 2.0, "tick_ms": 20 }"#).unwrap();
        assert_eq!(config.linear_speed_mps, 2.0);
        assert_eq!(config.tick(), Duration::from_millis(20));
        assert_eq!(config.yaw_rate_deg_s, 30.0);
        assert_eq!(config.orbit_speed_mps, 1.5);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = ControllerConfig::from_json("{ tick_ms: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ControllerConfig::load("/nonexistent/offboard_pilot.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let config = ControllerConfig {
            settle_s: -1.0,
            ..Default::default()
        };
        assert_eq!(config.settle(), Duration::ZERO);
    }

    #[test]
    fn test_unrepresentable_duration_clamps_to_zero() {
        let config = ControllerConfig {
            land_timeout_s: 1e300,
            telemetry_timeout_s: f64::NAN,
            ..Default::default()
        };
        assert_eq!(config.land_timeout(), Duration::ZERO);
        assert_eq!(config.telemetry_timeout(), Duration::ZERO);
    }
}
