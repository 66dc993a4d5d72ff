//! Telemetry value types read from the vehicle link.

use core::fmt;

use offboard_pilot_core::GeoFix;

/// Global position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Latitude in degrees.
    pub lat_deg: f64,
    /// Longitude in degrees.
    pub lon_deg: f64,
    /// Altitude above mean sea level in meters.
    pub abs_alt_m: f64,
    /// Altitude above the home position in meters.
    pub rel_alt_m: f64,
}

impl From<&Position> for GeoFix {
    fn from(p: &Position) -> Self {
        GeoFix::new(p.lat_deg, p.lon_deg, p.abs_alt_m)
    }
}

impl From<Position> for GeoFix {
    fn from(p: Position) -> Self {
        GeoFix::from(&p)
    }
}

/// Euler attitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

/// Battery state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Battery {
    /// Remaining charge, 0-100 %.
    pub remaining_pct: f32,
    /// Pack voltage in volts.
    pub voltage_v: f32,
}

/// GPS fix type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpsFixType {
    #[default]
    NoGps,
    NoFix,
    Fix2D,
    Fix3D,
    FixDgps,
    RtkFloat,
    RtkFixed,
}

impl fmt::Display for GpsFixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GpsFixType::NoGps => "NO_GPS",
            GpsFixType::NoFix => "NO_FIX",
            GpsFixType::Fix2D => "FIX_2D",
            GpsFixType::Fix3D => "FIX_3D",
            GpsFixType::FixDgps => "FIX_DGPS",
            GpsFixType::RtkFloat => "RTK_FLOAT",
            GpsFixType::RtkFixed => "RTK_FIXED",
        };
        f.write_str(text)
    }
}

/// GPS receiver status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsInfo {
    pub fix_type: GpsFixType,
    pub num_satellites: u8,
}

/// Sensor calibration health relevant to the connect guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Health {
    pub accelerometer_calibration_ok: bool,
    pub gyrometer_calibration_ok: bool,
}

impl Health {
    /// Baseline health required before commanding motion.
    pub fn is_baseline_ok(&self) -> bool {
        self.accelerometer_calibration_ok && self.gyrometer_calibration_ok
    }
}

/// Autopilot flight mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightMode {
    #[default]
    Unknown,
    Manual,
    Stabilized,
    Acro,
    Altitude,
    Position,
    Hold,
    Takeoff,
    Mission,
    ReturnToLaunch,
    Land,
    Offboard,
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlightMode::Unknown => "UNKNOWN",
            FlightMode::Manual => "MANUAL",
            FlightMode::Stabilized => "STABILIZED",
            FlightMode::Acro => "ACRO",
            FlightMode::Altitude => "ALTCTL",
            FlightMode::Position => "POSCTL",
            FlightMode::Hold => "HOLD",
            FlightMode::Takeoff => "TAKEOFF",
            FlightMode::Mission => "MISSION",
            FlightMode::ReturnToLaunch => "RETURN_TO_LAUNCH",
            FlightMode::Land => "LAND",
            FlightMode::Offboard => "OFFBOARD",
        };
        f.write_str(text)
    }
}

/// Immutable read of the vehicle state, fetched on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleSnapshot {
    pub position: Position,
    pub attitude: Attitude,
    pub armed: bool,
    pub in_air: bool,
    pub battery: Battery,
    pub gps: GpsInfo,
    pub flight_mode: FlightMode,
}

impl fmt::Display for VehicleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- STATUS ----")?;
        writeln!(f, "Armed: {}", self.armed)?;
        writeln!(f, "In air: {}", self.in_air)?;
        writeln!(f, "Flight mode: {}", self.flight_mode)?;
        writeln!(
            f,
            "Rel Alt: {:.2} m | Abs Alt: {:.2} m",
            self.position.rel_alt_m, self.position.abs_alt_m
        )?;
        writeln!(
            f,
            "Lat/Lon: {:.6}, {:.6}",
            self.position.lat_deg, self.position.lon_deg
        )?;
        writeln!(f, "Heading: {:.1}°", self.attitude.yaw_deg)?;
        writeln!(f, "{}", BatteryLine(&self.battery))?;
        writeln!(
            f,
            "GPS: {} ({} sats)",
            self.gps.fix_type, self.gps.num_satellites
        )?;
        write!(f, "----------------")
    }
}

/// One-line battery summary ("Battery: 87% (15.9 V)").
pub struct BatteryLine<'a>(pub &'a Battery);

impl fmt::Display for BatteryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Battery: {:.0}% ({:.1} V)",
            self.0.remaining_pct, self.0.voltage_v
        )
    }
}
