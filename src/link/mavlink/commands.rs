//! Outgoing MAVLink message builders.

use mavlink::common::{
    MavCmd, MavFrame, MavMessage, MavResult, PositionTargetTypemask, COMMAND_INT_DATA,
    COMMAND_LONG_DATA, SET_POSITION_TARGET_LOCAL_NED_DATA,
};

use offboard_pilot_core::{ActionResult, GeoFix, VelocityBodyYawspeed};

use super::telemetry::{PX4_AUTO_LOITER, PX4_MAIN_MODE_AUTO, PX4_MAIN_MODE_OFFBOARD};

/// MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
const CUSTOM_MODE_ENABLED: f32 = 1.0;
/// MAV_DO_REPOSITION_FLAGS_CHANGE_MODE
const REPOSITION_CHANGE_MODE: f32 = 1.0;
/// GIMBAL_MANAGER_INFORMATION message id.
pub const GIMBAL_MANAGER_INFORMATION_ID: f32 = 280.0;

/// System and component addressed by outgoing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub system_id: u8,
    pub component_id: u8,
}

pub fn command_long(
    target: Target,
    command: MavCmd,
    params: [f32; 7],
    confirmation: u8,
) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system: target.system_id,
        target_component: target.component_id,
        command,
        confirmation,
        param1: params[0],
        param2: params[1],
        param3: params[2],
        param4: params[3],
        param5: params[4],
        param6: params[5],
        param7: params[6],
    })
}

/// DO_REPOSITION to an absolute position, as COMMAND_INT.
pub fn reposition(target: Target, fix: &GeoFix, yaw_deg: f64) -> MavMessage {
    MavMessage::COMMAND_INT(COMMAND_INT_DATA {
        target_system: target.system_id,
        target_component: target.component_id,
        frame: MavFrame::MAV_FRAME_GLOBAL,
        command: MavCmd::MAV_CMD_DO_REPOSITION,
        current: 0,
        autocontinue: 0,
        param1: -1.0, // default ground speed
        param2: REPOSITION_CHANGE_MODE,
        param3: 0.0,
        param4: yaw_deg.to_radians() as f32,
        x: (fix.lat_deg * 1e7).round() as i32,
        y: (fix.lon_deg * 1e7).round() as i32,
        z: fix.abs_alt_m as f32,
    })
}

/// Body-frame velocity and yaw rate; position, acceleration and yaw ignored.
pub fn velocity_body(
    target: Target,
    setpoint: &VelocityBodyYawspeed,
    time_boot_ms: u32,
) -> MavMessage {
    let type_mask = PositionTargetTypemask::POSITION_TARGET_TYPEMASK_X_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_Y_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_Z_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE;

    MavMessage::SET_POSITION_TARGET_LOCAL_NED(SET_POSITION_TARGET_LOCAL_NED_DATA {
        time_boot_ms,
        target_system: target.system_id,
        target_component: target.component_id,
        coordinate_frame: MavFrame::MAV_FRAME_BODY_NED,
        type_mask,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        vx: setpoint.forward_m_s as f32,
        vy: setpoint.right_m_s as f32,
        vz: setpoint.down_m_s as f32,
        afx: 0.0,
        afy: 0.0,
        afz: 0.0,
        yaw: 0.0,
        yaw_rate: setpoint.yawspeed_deg_s.to_radians() as f32,
    })
}

pub fn arm_params(arm: bool) -> [f32; 7] {
    [if arm { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
}

pub fn offboard_mode_params() -> [f32; 7] {
    [
        CUSTOM_MODE_ENABLED,
        PX4_MAIN_MODE_OFFBOARD as f32,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ]
}

/// Hold is PX4's AUTO.LOITER.
pub fn hold_mode_params() -> [f32; 7] {
    [
        CUSTOM_MODE_ENABLED,
        PX4_MAIN_MODE_AUTO as f32,
        PX4_AUTO_LOITER as f32,
        0.0,
        0.0,
        0.0,
        0.0,
    ]
}

/// NAV_TAKEOFF to an absolute altitude at the current position.
pub fn takeoff_params(abs_alt_m: f64) -> [f32; 7] {
    [
        0.0,
        0.0,
        0.0,
        f32::NAN,
        f32::NAN,
        f32::NAN,
        abs_alt_m as f32,
    ]
}

pub fn land_params() -> [f32; 7] {
    [0.0, 0.0, 0.0, f32::NAN, f32::NAN, f32::NAN, f32::NAN]
}

pub fn gimbal_angle_params(pitch_deg: f64, yaw_deg: f64) -> [f32; 7] {
    [
        pitch_deg as f32,
        yaw_deg as f32,
        f32::NAN,
        f32::NAN,
        0.0,
        0.0,
        0.0,
    ]
}

pub fn gimbal_rate_params(pitch_rate_deg_s: f64, yaw_rate_deg_s: f64) -> [f32; 7] {
    [
        f32::NAN,
        f32::NAN,
        pitch_rate_deg_s as f32,
        yaw_rate_deg_s as f32,
        0.0,
        0.0,
        0.0,
    ]
}

pub fn request_message_params(message_id: f32) -> [f32; 7] {
    [message_id, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
}

/// Map a COMMAND_ACK result to an action result code.
pub fn action_result(result: MavResult) -> ActionResult {
    match result {
        MavResult::MAV_RESULT_ACCEPTED => ActionResult::Success,
        MavResult::MAV_RESULT_TEMPORARILY_REJECTED => ActionResult::Busy,
        MavResult::MAV_RESULT_DENIED => ActionResult::CommandDenied,
        MavResult::MAV_RESULT_UNSUPPORTED => ActionResult::Unsupported,
        MavResult::MAV_RESULT_FAILED => ActionResult::Failed,
        _ => ActionResult::Unknown,
    }
}
