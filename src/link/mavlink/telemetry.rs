//! Telemetry cache fed by incoming MAVLink messages.

use mavlink::common::{
    GpsFixType as MavGpsFixType, MavAutopilot, MavLandedState, MavMessage, MavModeFlag, MavState,
    MavSysStatusSensor, MavType, HEARTBEAT_DATA,
};

use crate::types::{Attitude, Battery, FlightMode, GpsFixType, GpsInfo, Health, Position};

/// PX4 main modes carried in bits 16..24 of `custom_mode`.
pub const PX4_MAIN_MODE_MANUAL: u8 = 1;
pub const PX4_MAIN_MODE_ALTCTL: u8 = 2;
pub const PX4_MAIN_MODE_POSCTL: u8 = 3;
pub const PX4_MAIN_MODE_AUTO: u8 = 4;
pub const PX4_MAIN_MODE_ACRO: u8 = 5;
pub const PX4_MAIN_MODE_OFFBOARD: u8 = 6;
pub const PX4_MAIN_MODE_STABILIZED: u8 = 7;

/// PX4 auto sub modes carried in bits 24..32 of `custom_mode`.
pub const PX4_AUTO_TAKEOFF: u8 = 2;
pub const PX4_AUTO_LOITER: u8 = 3;
pub const PX4_AUTO_MISSION: u8 = 4;
pub const PX4_AUTO_RTL: u8 = 5;
pub const PX4_AUTO_LAND: u8 = 6;

/// Latest value of every telemetry item the link exposes.
#[derive(Debug, Clone, Default)]
pub struct TelemetryCache {
    pub position: Option<Position>,
    pub attitude: Option<Attitude>,
    pub armed: Option<bool>,
    pub custom_mode: Option<u32>,
    pub system_active: Option<bool>,
    pub landed_state: Option<MavLandedState>,
    pub battery: Option<Battery>,
    pub gps: Option<GpsInfo>,
    pub health: Option<Health>,
    /// A GIMBAL_MANAGER_INFORMATION message has been seen.
    pub gimbal_manager: bool,
}

impl TelemetryCache {
    /// Fold one message into the cache.
    pub fn apply(&mut self, msg: &MavMessage) {
        match msg {
            MavMessage::HEARTBEAT(hb) => {
                self.armed = Some(hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED));
                self.custom_mode = Some(hb.custom_mode);
                self.system_active = Some(hb.system_status == MavState::MAV_STATE_ACTIVE);
            }
            MavMessage::GLOBAL_POSITION_INT(pos) => {
                self.position = Some(Position {
                    lat_deg: pos.lat as f64 / 1e7,
                    lon_deg: pos.lon as f64 / 1e7,
                    abs_alt_m: pos.alt as f64 / 1000.0,
                    rel_alt_m: pos.relative_alt as f64 / 1000.0,
                });
            }
            MavMessage::ATTITUDE(att) => {
                self.attitude = Some(Attitude {
                    yaw_deg: (att.yaw as f64).to_degrees(),
                    pitch_deg: (att.pitch as f64).to_degrees(),
                    roll_deg: (att.roll as f64).to_degrees(),
                });
            }
            MavMessage::EXTENDED_SYS_STATE(state) => {
                self.landed_state = Some(state.landed_state);
            }
            MavMessage::SYS_STATUS(status) => {
                let ok = |flag: MavSysStatusSensor| {
                    !status.onboard_control_sensors_present.contains(flag)
                        || status.onboard_control_sensors_health.contains(flag)
                };
                self.health = Some(Health {
                    accelerometer_calibration_ok: ok(MavSysStatusSensor::MAV_SYS_STATUS_SENSOR_3D_ACCEL),
                    gyrometer_calibration_ok: ok(MavSysStatusSensor::MAV_SYS_STATUS_SENSOR_3D_GYRO),
                });
                let previous = self.battery.unwrap_or_default();
                self.battery = Some(Battery {
                    remaining_pct: if status.battery_remaining >= 0 {
                        status.battery_remaining as f32
                    } else {
                        previous.remaining_pct
                    },
                    voltage_v: if status.voltage_battery != u16::MAX {
                        status.voltage_battery as f32 / 1000.0
                    } else {
                        previous.voltage_v
                    },
                });
            }
            MavMessage::GPS_RAW_INT(gps) => {
                self.gps = Some(GpsInfo {
                    fix_type: gps_fix_from_mav(gps.fix_type),
                    num_satellites: if gps.satellites_visible == u8::MAX {
                        0
                    } else {
                        gps.satellites_visible
                    },
                });
            }
            MavMessage::GIMBAL_MANAGER_INFORMATION(_) => {
                self.gimbal_manager = true;
            }
            _ => {}
        }
    }

    /// In-air state from EXTENDED_SYS_STATE, falling back to the heartbeat
    /// system status when the autopilot does not send it.
    pub fn in_air(&self) -> Option<bool> {
        match self.landed_state {
            Some(MavLandedState::MAV_LANDED_STATE_IN_AIR)
            | Some(MavLandedState::MAV_LANDED_STATE_TAKEOFF)
            | Some(MavLandedState::MAV_LANDED_STATE_LANDING) => Some(true),
            Some(MavLandedState::MAV_LANDED_STATE_ON_GROUND) => Some(false),
            _ => self.system_active,
        }
    }

    pub fn flight_mode(&self) -> Option<FlightMode> {
        self.custom_mode.map(px4_flight_mode)
    }
}

/// Decode a PX4 `custom_mode` into a flight mode.
pub fn px4_flight_mode(custom_mode: u32) -> FlightMode {
    let main = ((custom_mode >> 16) & 0xFF) as u8;
    let sub = ((custom_mode >> 24) & 0xFF) as u8;
    match main {
        PX4_MAIN_MODE_MANUAL => FlightMode::Manual,
        PX4_MAIN_MODE_ALTCTL => FlightMode::Altitude,
        PX4_MAIN_MODE_POSCTL => FlightMode::Position,
        PX4_MAIN_MODE_ACRO => FlightMode::Acro,
        PX4_MAIN_MODE_OFFBOARD => FlightMode::Offboard,
        PX4_MAIN_MODE_STABILIZED => FlightMode::Stabilized,
        PX4_MAIN_MODE_AUTO => match sub {
            PX4_AUTO_TAKEOFF => FlightMode::Takeoff,
            PX4_AUTO_LOITER => FlightMode::Hold,
            PX4_AUTO_MISSION => FlightMode::Mission,
            PX4_AUTO_RTL => FlightMode::ReturnToLaunch,
            PX4_AUTO_LAND => FlightMode::Land,
            _ => FlightMode::Unknown,
        },
        _ => FlightMode::Unknown,
    }
}

/// Whether a heartbeat comes from an autopilot rather than another GCS.
pub fn is_autopilot(hb: &HEARTBEAT_DATA) -> bool {
    hb.autopilot != MavAutopilot::MAV_AUTOPILOT_INVALID && hb.mavtype != MavType::MAV_TYPE_GCS
}

/// Build the 1 Hz GCS HEARTBEAT.
pub fn build_gcs_heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_GCS,
        autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

fn gps_fix_from_mav(fix: MavGpsFixType) -> GpsFixType {
    match fix {
        MavGpsFixType::GPS_FIX_TYPE_NO_GPS => GpsFixType::NoGps,
        MavGpsFixType::GPS_FIX_TYPE_NO_FIX => GpsFixType::NoFix,
        MavGpsFixType::GPS_FIX_TYPE_2D_FIX => GpsFixType::Fix2D,
        MavGpsFixType::GPS_FIX_TYPE_3D_FIX => GpsFixType::Fix3D,
        MavGpsFixType::GPS_FIX_TYPE_DGPS => GpsFixType::FixDgps,
        MavGpsFixType::GPS_FIX_TYPE_RTK_FLOAT => GpsFixType::RtkFloat,
        MavGpsFixType::GPS_FIX_TYPE_RTK_FIXED => GpsFixType::RtkFixed,
        _ => GpsFixType::Fix3D,
    }
}
