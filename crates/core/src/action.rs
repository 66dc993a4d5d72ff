//! Vehicle action result codes
//!
//! Reason codes reported by the vehicle when an action (arm, takeoff, land,
//! return-to-launch, go-to, offboard start) is accepted or refused.

use core::fmt;

/// Outcome of a vehicle action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Request accepted
    Success,
    /// No response or an unrecognized result
    Unknown,
    /// No vehicle is connected
    NoSystem,
    /// Link-level failure while sending
    ConnectionError,
    /// Vehicle is busy with another command
    Busy,
    /// Vehicle refused the command (pre-flight condition not met)
    CommandDenied,
    /// Refused because the landed state is unknown
    CommandDeniedLandedStateUnknown,
    /// Refused because the vehicle is not landed
    CommandDeniedNotLanded,
    /// No acknowledgement within the retry budget
    Timeout,
    /// A command parameter was rejected
    ParameterError,
    /// Vehicle does not support the command
    Unsupported,
    /// Vehicle accepted the command but execution failed
    Failed,
}

impl ActionResult {
    pub fn is_success(self) -> bool {
        self == ActionResult::Success
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionResult::Success => "Success",
            ActionResult::Unknown => "Unknown",
            ActionResult::NoSystem => "No system connected",
            ActionResult::ConnectionError => "Connection error",
            ActionResult::Busy => "Vehicle busy",
            ActionResult::CommandDenied => "Command denied",
            ActionResult::CommandDeniedLandedStateUnknown => {
                "Command denied: landed state unknown"
            }
            ActionResult::CommandDeniedNotLanded => "Command denied: not landed",
            ActionResult::Timeout => "Timeout",
            ActionResult::ParameterError => "Parameter error",
            ActionResult::Unsupported => "Unsupported",
            ActionResult::Failed => "Failed",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_action_result_display() {
        assert_eq!(format!("{}", ActionResult::CommandDenied), "Command denied");
        assert_eq!(format!("{}", ActionResult::Timeout), "Timeout");
    }

    #[test]
    fn test_only_success_is_success() {
        assert!(ActionResult::Success.is_success());
        assert!(!ActionResult::Busy.is_success());
        assert!(!ActionResult::Unknown.is_success());
    }
}
