//! Recording vehicle link shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use offboard_pilot::error::LinkError;
use offboard_pilot::link::{Capability, CapabilitySupport, VehicleLink};
use offboard_pilot::types::{
    Attitude, Battery, FlightMode, GpsFixType, GpsInfo, Health, Position,
};
use offboard_pilot::{ControllerConfig, VehicleSession};
use offboard_pilot_core::{ActionResult, GeoFix, VelocityBodyYawspeed};

pub const HOME_LAT: f64 = 47.397742;
pub const HOME_LON: f64 = 8.545594;
pub const HOME_ABS_M: f64 = 498.0;

#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    Connect,
    Arm,
    Disarm,
    SetTakeoffAltitude(f64),
    Takeoff,
    Land,
    ReturnToLaunch,
    Goto { target: GeoFix, yaw_deg: f64 },
    StartOffboard,
    StopOffboard,
    Setpoint(VelocityBodyYawspeed),
    GimbalAngle { pitch_deg: f64 },
    GimbalRate { pitch_rate_deg_s: f64 },
}

#[derive(Debug)]
struct MockState {
    calls: Vec<(Instant, LinkCall)>,
    position: Position,
    yaw_deg: f64,
    yaw_rate_deg_s: f64,
    yaw_updated: Instant,
    armed: bool,
    in_air: bool,
    setpoints_sent: usize,
}

impl MockState {
    fn integrate_yaw(&mut self, now: Instant, rate_scale: f64) {
        let dt = (now - self.yaw_updated).as_secs_f64();
        self.yaw_deg = (self.yaw_deg + rate_scale * self.yaw_rate_deg_s * dt).rem_euclid(360.0);
        self.yaw_updated = now;
    }
}

/// Behaviour switches for [`RecordingLink`].
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Fraction of the commanded yaw rate the heading follows; 0 stalls it.
    pub heading_rate_scale: f64,
    /// Setpoint sends start failing after this many successes.
    pub setpoint_failures_after: Option<usize>,
    /// Go-to is accepted but the vehicle never moves.
    pub position_frozen: bool,
    pub reject_arm: bool,
    pub gimbal_angle: CapabilitySupport,
    pub gimbal_rate: CapabilitySupport,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            heading_rate_scale: 1.0,
            setpoint_failures_after: None,
            position_frozen: false,
            reject_arm: false,
            gimbal_angle: CapabilitySupport::Unsupported,
            gimbal_rate: CapabilitySupport::Unsupported,
        }
    }
}

/// Vehicle link that records every command with its (paused-clock) time.
///
/// Heading integrates the last yaw-rate setpoint; go-to teleports the
/// vehicle to its target unless the position is frozen.
pub struct RecordingLink {
    behavior: MockBehavior,
    state: Mutex<MockState>,
}

impl RecordingLink {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(MockState {
                calls: Vec::new(),
                position: Position {
                    lat_deg: HOME_LAT,
                    lon_deg: HOME_LON,
                    abs_alt_m: HOME_ABS_M,
                    rel_alt_m: 10.0,
                },
                yaw_deg: 0.0,
                yaw_rate_deg_s: 0.0,
                yaw_updated: Instant::now(),
                armed: true,
                in_air: true,
                setpoints_sent: 0,
            }),
        }
    }

    pub fn set_position(&self, position: Position) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_armed(&self, armed: bool) {
        self.state.lock().unwrap().armed = armed;
    }

    pub fn calls(&self) -> Vec<LinkCall> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, LinkCall)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// All recorded setpoints in order.
    pub fn setpoints(&self) -> Vec<VelocityBodyYawspeed> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LinkCall::Setpoint(sp) => Some(sp),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: LinkCall) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        if let LinkCall::Setpoint(sp) = &call {
            state.integrate_yaw(now, self.behavior.heading_rate_scale);
            state.yaw_rate_deg_s = sp.yawspeed_deg_s;
        }
        state.calls.push((now, call));
    }
}

pub fn session_with(behavior: MockBehavior) -> (Arc<RecordingLink>, VehicleSession) {
    let link = Arc::new(RecordingLink::new(behavior));
    let session = VehicleSession::new(link.clone(), ControllerConfig::default());
    (link, session)
}

#[async_trait]
impl VehicleLink for RecordingLink {
    fn link_type(&self) -> &'static str {
        "recording"
    }

    async fn connect(&self) -> Result<(), LinkError> {
        self.record(LinkCall::Connect);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn health(&self) -> Result<Health, LinkError> {
        Ok(Health {
            accelerometer_calibration_ok: true,
            gyrometer_calibration_ok: true,
        })
    }

    async fn position(&self) -> Result<Position, LinkError> {
        Ok(self.state.lock().unwrap().position)
    }

    async fn attitude(&self) -> Result<Attitude, LinkError> {
        let mut state = self.state.lock().unwrap();
        state.integrate_yaw(Instant::now(), self.behavior.heading_rate_scale);
        Ok(Attitude {
            yaw_deg: state.yaw_deg,
            pitch_deg: 0.0,
            roll_deg: 0.0,
        })
    }

    async fn armed(&self) -> Result<bool, LinkError> {
        Ok(self.state.lock().unwrap().armed)
    }

    async fn in_air(&self) -> Result<bool, LinkError> {
        Ok(self.state.lock().unwrap().in_air)
    }

    async fn battery(&self) -> Result<Battery, LinkError> {
        Ok(Battery {
            remaining_pct: 87.0,
            voltage_v: 15.9,
        })
    }

    async fn gps_info(&self) -> Result<GpsInfo, LinkError> {
        Ok(GpsInfo {
            fix_type: GpsFixType::Fix3D,
            num_satellites: 12,
        })
    }

    async fn flight_mode(&self) -> Result<FlightMode, LinkError> {
        Ok(FlightMode::Hold)
    }

    async fn arm(&self) -> Result<(), LinkError> {
        self.record(LinkCall::Arm);
        if self.behavior.reject_arm {
            return Err(LinkError::Rejected {
                action: "arm",
                result: ActionResult::CommandDenied,
            });
        }
        self.set_armed(true);
        Ok(())
    }

    async fn disarm(&self) -> Result<(), LinkError> {
        self.record(LinkCall::Disarm);
        self.set_armed(false);
        Ok(())
    }

    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<(), LinkError> {
        self.record(LinkCall::SetTakeoffAltitude(altitude_m));
        Ok(())
    }

    async fn takeoff(&self) -> Result<(), LinkError> {
        self.record(LinkCall::Takeoff);
        Ok(())
    }

    async fn land(&self) -> Result<(), LinkError> {
        self.record(LinkCall::Land);
        let mut state = self.state.lock().unwrap();
        state.in_air = false;
        state.position.rel_alt_m = 0.0;
        Ok(())
    }

    async fn return_to_launch(&self) -> Result<(), LinkError> {
        self.record(LinkCall::ReturnToLaunch);
        Ok(())
    }

    async fn goto_location(&self, target: GeoFix, yaw_deg: f64) -> Result<(), LinkError> {
        self.record(LinkCall::Goto { target, yaw_deg });
        if !self.behavior.position_frozen {
            let mut state = self.state.lock().unwrap();
            let climb = target.abs_alt_m - state.position.abs_alt_m;
            state.position = Position {
                lat_deg: target.lat_deg,
                lon_deg: target.lon_deg,
                abs_alt_m: target.abs_alt_m,
                rel_alt_m: state.position.rel_alt_m + climb,
            };
        }
        Ok(())
    }

    async fn start_offboard(&self) -> Result<(), LinkError> {
        self.record(LinkCall::StartOffboard);
        Ok(())
    }

    async fn stop_offboard(&self) -> Result<(), LinkError> {
        self.record(LinkCall::StopOffboard);
        Ok(())
    }

    async fn set_velocity_body(&self, setpoint: VelocityBodyYawspeed) -> Result<(), LinkError> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(limit) = self.behavior.setpoint_failures_after {
                if state.setpoints_sent >= limit {
                    return Err(LinkError::Timeout("setpoint"));
                }
            }
            state.setpoints_sent += 1;
        }
        self.record(LinkCall::Setpoint(setpoint));
        Ok(())
    }

    async fn probe(&self, capability: Capability) -> CapabilitySupport {
        match capability {
            Capability::GimbalAngle => self.behavior.gimbal_angle.clone(),
            Capability::GimbalRate => self.behavior.gimbal_rate.clone(),
        }
    }

    async fn set_gimbal_angle(&self, pitch_deg: f64, _yaw_deg: f64) -> Result<(), LinkError> {
        self.record(LinkCall::GimbalAngle { pitch_deg });
        Ok(())
    }

    async fn set_gimbal_rate(
        &self,
        pitch_rate_deg_s: f64,
        _yaw_rate_deg_s: f64,
    ) -> Result<(), LinkError> {
        self.record(LinkCall::GimbalRate { pitch_rate_deg_s });
        Ok(())
    }
}
