//! Simulated multicopter link.
//!
//! Built-in kinematics with no external dependencies, used by `--sim` and by
//! the integration tests. State is integrated lazily on every call against
//! `tokio::time::Instant`, so a paused test clock drives it deterministically.
//! Position noise is seeded for reproducible runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use offboard_pilot_core::{wrap_360, ActionResult, GeoFix, VelocityBodyYawspeed};

use crate::error::LinkError;
use crate::link::{Capability, CapabilitySupport, VehicleLink};
use crate::types::{
    Attitude, Battery, FlightMode, GpsFixType, GpsInfo, Health, Position,
};

const METERS_PER_DEG_LAT: f64 = 111_320.0;
/// Offboard entry requires a setpoint no older than this.
const SETPOINT_FRESHNESS: Duration = Duration::from_millis(500);
const GROUND_EPSILON_M: f64 = 0.05;

/// Configuration for the simulated vehicle.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Home latitude in degrees.
    pub origin_lat_deg: f64,
    /// Home longitude in degrees.
    pub origin_lon_deg: f64,
    /// Home altitude above mean sea level in meters.
    pub origin_abs_alt_m: f64,
    /// Initial heading in degrees.
    pub initial_yaw_deg: f64,
    /// Climb and descent rate for takeoff and landing, m/s.
    pub climb_rate_mps: f64,
    /// Cruise speed for go-to and RTL, m/s.
    pub cruise_speed_mps: f64,
    /// Position noise standard deviation in meters.
    pub gps_noise_m: f64,
    /// Heading noise standard deviation in degrees.
    pub heading_noise_deg: f64,
    /// Battery drain while armed, percent per second.
    pub battery_drain_pct_s: f64,
    /// Whether a gimbal is fitted.
    pub gimbal: bool,
    /// Integration step.
    pub step: Duration,
    /// RNG seed for deterministic mode. None = random.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            origin_lat_deg: 47.397742,
            origin_lon_deg: 8.545594,
            origin_abs_alt_m: 488.0,
            initial_yaw_deg: 0.0,
            climb_rate_mps: 1.5,
            cruise_speed_mps: 5.0,
            gps_noise_m: 0.05,
            heading_noise_deg: 0.1,
            battery_drain_pct_s: 0.02,
            gimbal: true,
            step: Duration::from_millis(10),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SimMode {
    Idle,
    Takeoff { target_up_m: f64 },
    Hold,
    Offboard,
    Goto { north_m: f64, east_m: f64, up_m: f64 },
    ReturnToLaunch,
    Land,
}

impl SimMode {
    fn flight_mode(self) -> FlightMode {
        match self {
            SimMode::Idle | SimMode::Hold => FlightMode::Hold,
            SimMode::Takeoff { .. } => FlightMode::Takeoff,
            SimMode::Offboard => FlightMode::Offboard,
            SimMode::Goto { .. } => FlightMode::Hold,
            SimMode::ReturnToLaunch => FlightMode::ReturnToLaunch,
            SimMode::Land => FlightMode::Land,
        }
    }
}

/// Internal vehicle state for kinematics integration.
#[derive(Debug)]
struct SimState {
    connected: bool,
    /// North of home in meters.
    north_m: f64,
    /// East of home in meters.
    east_m: f64,
    /// Height above home in meters.
    up_m: f64,
    /// Heading in degrees, 0 = north, clockwise positive.
    yaw_deg: f64,
    armed: bool,
    mode: SimMode,
    setpoint: VelocityBodyYawspeed,
    last_setpoint: Option<Instant>,
    takeoff_alt_m: f64,
    battery_pct: f64,
    gimbal_pitch_deg: f64,
    gimbal_rate_deg_s: f64,
    last_update: Instant,
    rng: StdRng,
}

impl SimState {
    fn new(config: &SimConfig) -> Self {
        Self {
            connected: false,
            north_m: 0.0,
            east_m: 0.0,
            up_m: 0.0,
            yaw_deg: config.initial_yaw_deg,
            armed: false,
            mode: SimMode::Idle,
            setpoint: VelocityBodyYawspeed::ZERO,
            last_setpoint: None,
            takeoff_alt_m: 2.5,
            battery_pct: 100.0,
            gimbal_pitch_deg: 0.0,
            gimbal_rate_deg_s: 0.0,
            last_update: Instant::now(),
            rng: seeded_rng(config.seed),
        }
    }

    fn in_air(&self) -> bool {
        self.up_m > GROUND_EPSILON_M || matches!(self.mode, SimMode::Takeoff { .. })
    }

    /// Integrate kinematics up to `now` in fixed steps.
    fn advance(&mut self, config: &SimConfig, now: Instant) {
        let step = config.step.max(Duration::from_millis(1));
        while self.last_update + step <= now {
            self.integrate(config, step.as_secs_f64());
            self.last_update += step;
        }
    }

    fn integrate(&mut self, config: &SimConfig, dt: f64) {
        if self.armed {
            self.battery_pct = (self.battery_pct - config.battery_drain_pct_s * dt).max(0.0);
        }
        self.gimbal_pitch_deg =
            (self.gimbal_pitch_deg + self.gimbal_rate_deg_s * dt).clamp(-90.0, 0.0);

        match self.mode {
            SimMode::Idle | SimMode::Hold => {}
            SimMode::Takeoff { target_up_m } => {
                self.up_m = (self.up_m + config.climb_rate_mps * dt).min(target_up_m);
                if self.up_m >= target_up_m {
                    self.mode = SimMode::Hold;
                }
            }
            SimMode::Offboard => {
                if !self.armed {
                    return;
                }
                let sp = self.setpoint;
                let (sin, cos) = self.yaw_deg.to_radians().sin_cos();
                self.north_m += (sp.forward_m_s * cos - sp.right_m_s * sin) * dt;
                self.east_m += (sp.forward_m_s * sin + sp.right_m_s * cos) * dt;
                self.up_m = (self.up_m - sp.down_m_s * dt).max(0.0);
                self.yaw_deg = wrap_360(self.yaw_deg + sp.yawspeed_deg_s * dt);
            }
            SimMode::Goto {
                north_m,
                east_m,
                up_m,
            } => {
                if self.fly_toward(north_m, east_m, up_m, config.cruise_speed_mps * dt) {
                    self.mode = SimMode::Hold;
                }
            }
            SimMode::ReturnToLaunch => {
                let up = self.up_m;
                if self.fly_toward(0.0, 0.0, up, config.cruise_speed_mps * dt) {
                    self.mode = SimMode::Land;
                }
            }
            SimMode::Land => {
                self.up_m = (self.up_m - config.climb_rate_mps * dt).max(0.0);
                if self.up_m <= 0.0 {
                    self.mode = SimMode::Idle;
                }
            }
        }
    }

    /// Move at most `max_step_m` toward the target. Returns true on arrival.
    fn fly_toward(&mut self, north_m: f64, east_m: f64, up_m: f64, max_step_m: f64) -> bool {
        let dn = north_m - self.north_m;
        let de = east_m - self.east_m;
        let du = up_m - self.up_m;
        let distance = (dn * dn + de * de + du * du).sqrt();
        if distance <= max_step_m {
            self.north_m = north_m;
            self.east_m = east_m;
            self.up_m = up_m;
            return true;
        }
        let scale = max_step_m / distance;
        self.north_m += dn * scale;
        self.east_m += de * scale;
        self.up_m += du * scale;
        false
    }

    /// Generate Gaussian noise using Box-Muller transform.
    fn gaussian_noise(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen::<f64>().max(f64::EPSILON);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * stddev
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn denied(action: &'static str) -> LinkError {
    LinkError::Rejected {
        action,
        result: ActionResult::CommandDenied,
    }
}

/// Simulated vehicle implementing [`VehicleLink`].
pub struct SimulatedVehicle {
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimulatedVehicle {
    pub fn new(config: SimConfig) -> Self {
        let state = Mutex::new(SimState::new(&config));
        Self { config, state }
    }

    pub fn with_defaults() -> Self {
        Self::new(SimConfig::default())
    }

    /// Run `f` on the state after integrating up to now.
    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> T) -> Result<T, LinkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LinkError::ProtocolError("simulator state poisoned".to_string()))?;
        if !state.connected {
            return Err(LinkError::NotConnected);
        }
        state.advance(&self.config, Instant::now());
        Ok(f(&mut state))
    }

    /// Local offset from home in meters (north, east, up), without noise.
    pub fn local_position(&self) -> Result<(f64, f64, f64), LinkError> {
        self.with_state(|s| (s.north_m, s.east_m, s.up_m))
    }

    /// Heading in degrees, without noise.
    pub fn heading_deg(&self) -> Result<f64, LinkError> {
        self.with_state(|s| s.yaw_deg)
    }

    pub fn gimbal_pitch_deg(&self) -> Result<f64, LinkError> {
        self.with_state(|s| s.gimbal_pitch_deg)
    }

    fn local_offset(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let north = (lat_deg - self.config.origin_lat_deg) * METERS_PER_DEG_LAT;
        let east = (lon_deg - self.config.origin_lon_deg) * self.meters_per_deg_lon();
        (north, east)
    }

    fn meters_per_deg_lon(&self) -> f64 {
        METERS_PER_DEG_LAT * self.config.origin_lat_deg.to_radians().cos()
    }
}

impl std::fmt::Debug for SimulatedVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedVehicle")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl VehicleLink for SimulatedVehicle {
    fn link_type(&self) -> &'static str {
        "sim"
    }

    async fn connect(&self) -> Result<(), LinkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LinkError::ProtocolError("simulator state poisoned".to_string()))?;
        if !state.connected {
            *state = SimState::new(&self.config);
            state.connected = true;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().map(|s| s.connected).unwrap_or(false)
    }

    async fn health(&self) -> Result<Health, LinkError> {
        self.with_state(|_| Health {
            accelerometer_calibration_ok: true,
            gyrometer_calibration_ok: true,
        })
    }

    async fn position(&self) -> Result<Position, LinkError> {
        let noise = self.config.gps_noise_m;
        let (north, east, up) = self.with_state(|s| {
            let n = s.north_m + s.gaussian_noise(noise);
            let e = s.east_m + s.gaussian_noise(noise);
            (n, e, s.up_m)
        })?;
        Ok(Position {
            lat_deg: self.config.origin_lat_deg + north / METERS_PER_DEG_LAT,
            lon_deg: self.config.origin_lon_deg + east / self.meters_per_deg_lon(),
            abs_alt_m: self.config.origin_abs_alt_m + up,
            rel_alt_m: up,
        })
    }

    async fn attitude(&self) -> Result<Attitude, LinkError> {
        let noise = self.config.heading_noise_deg;
        self.with_state(|s| {
            let yaw = wrap_360(s.yaw_deg + s.gaussian_noise(noise));
            Attitude {
                yaw_deg: if yaw > 180.0 { yaw - 360.0 } else { yaw },
                pitch_deg: 0.0,
                roll_deg: 0.0,
            }
        })
    }

    async fn armed(&self) -> Result<bool, LinkError> {
        self.with_state(|s| s.armed)
    }

    async fn in_air(&self) -> Result<bool, LinkError> {
        self.with_state(|s| s.in_air())
    }

    async fn battery(&self) -> Result<Battery, LinkError> {
        self.with_state(|s| Battery {
            remaining_pct: s.battery_pct as f32,
            voltage_v: (14.0 + 2.8 * s.battery_pct / 100.0) as f32,
        })
    }

    async fn gps_info(&self) -> Result<GpsInfo, LinkError> {
        self.with_state(|_| GpsInfo {
            fix_type: GpsFixType::Fix3D,
            num_satellites: 12,
        })
    }

    async fn flight_mode(&self) -> Result<FlightMode, LinkError> {
        self.with_state(|s| s.mode.flight_mode())
    }

    async fn arm(&self) -> Result<(), LinkError> {
        self.with_state(|s| s.armed = true)
    }

    async fn disarm(&self) -> Result<(), LinkError> {
        self.with_state(|s| {
            if s.in_air() {
                return Err(denied("disarm"));
            }
            s.armed = false;
            s.mode = SimMode::Idle;
            Ok(())
        })?
    }

    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<(), LinkError> {
        if !(altitude_m.is_finite() && altitude_m > 0.0) {
            return Err(LinkError::Rejected {
                action: "set_takeoff_altitude",
                result: ActionResult::ParameterError,
            });
        }
        self.with_state(|s| s.takeoff_alt_m = altitude_m)
    }

    async fn takeoff(&self) -> Result<(), LinkError> {
        self.with_state(|s| {
            if !s.armed {
                return Err(denied("takeoff"));
            }
            s.mode = SimMode::Takeoff {
                target_up_m: s.takeoff_alt_m,
            };
            Ok(())
        })?
    }

    async fn land(&self) -> Result<(), LinkError> {
        self.with_state(|s| s.mode = SimMode::Land)
    }

    async fn return_to_launch(&self) -> Result<(), LinkError> {
        self.with_state(|s| {
            if !s.armed {
                return Err(denied("return_to_launch"));
            }
            s.mode = SimMode::ReturnToLaunch;
            Ok(())
        })?
    }

    async fn goto_location(&self, target: GeoFix, yaw_deg: f64) -> Result<(), LinkError> {
        let (north_m, east_m) = self.local_offset(target.lat_deg, target.lon_deg);
        let up_m = (target.abs_alt_m - self.config.origin_abs_alt_m).max(0.0);
        self.with_state(|s| {
            if !s.armed {
                return Err(denied("goto"));
            }
            s.yaw_deg = wrap_360(yaw_deg);
            s.mode = SimMode::Goto {
                north_m,
                east_m,
                up_m,
            };
            Ok(())
        })?
    }

    async fn start_offboard(&self) -> Result<(), LinkError> {
        let now = Instant::now();
        self.with_state(|s| {
            let fresh = s
                .last_setpoint
                .is_some_and(|t| now.duration_since(t) <= SETPOINT_FRESHNESS);
            if !fresh {
                return Err(denied("start_offboard"));
            }
            s.mode = SimMode::Offboard;
            Ok(())
        })?
    }

    async fn stop_offboard(&self) -> Result<(), LinkError> {
        self.with_state(|s| {
            if s.mode == SimMode::Offboard {
                s.mode = SimMode::Hold;
            }
            s.setpoint = VelocityBodyYawspeed::ZERO;
        })
    }

    async fn set_velocity_body(&self, setpoint: VelocityBodyYawspeed) -> Result<(), LinkError> {
        let now = Instant::now();
        self.with_state(|s| {
            s.setpoint = setpoint;
            s.last_setpoint = Some(now);
        })
    }

    async fn probe(&self, _capability: Capability) -> CapabilitySupport {
        if !self.is_connected() {
            return CapabilitySupport::Error("not connected".to_string());
        }
        if self.config.gimbal {
            CapabilitySupport::Supported
        } else {
            CapabilitySupport::Unsupported
        }
    }

    async fn set_gimbal_angle(&self, pitch_deg: f64, _yaw_deg: f64) -> Result<(), LinkError> {
        if !self.config.gimbal {
            return Err(LinkError::Unsupported("gimbal"));
        }
        self.with_state(|s| {
            s.gimbal_rate_deg_s = 0.0;
            s.gimbal_pitch_deg = pitch_deg.clamp(-90.0, 0.0);
        })
    }

    async fn set_gimbal_rate(
        &self,
        pitch_rate_deg_s: f64,
        _yaw_rate_deg_s: f64,
    ) -> Result<(), LinkError> {
        if !self.config.gimbal {
            return Err(LinkError::Unsupported("gimbal"));
        }
        self.with_state(|s| s.gimbal_rate_deg_s = pitch_rate_deg_s)
    }
}
