use offboard_pilot_core::ActionResult;

/// Errors that can occur on the vehicle link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("{action} rejected: {result}")]
    Rejected {
        action: &'static str,
        result: ActionResult,
    },

    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Reason code best describing this failure.
    pub fn action_result(&self) -> ActionResult {
        match self {
            LinkError::Rejected { result, .. } => *result,
            LinkError::NotConnected => ActionResult::NoSystem,
            LinkError::Timeout(_) => ActionResult::Timeout,
            LinkError::Unsupported(_) => ActionResult::Unsupported,
            LinkError::ConnectionFailed(_) | LinkError::Io(_) => ActionResult::ConnectionError,
            LinkError::ProtocolError(_) => ActionResult::Unknown,
        }
    }
}

/// Errors surfaced by the session guards and maneuvers.
///
/// Convergence timeouts and missing capabilities are not errors; they are
/// reported in maneuver results and logged as warnings.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Arm rejected: {reason}")]
    ArmRejected { reason: ActionResult },

    #[error("{action} rejected: {reason}")]
    ActionRejected {
        action: &'static str,
        reason: ActionResult,
    },

    #[error("Setpoint stream failed: {0}")]
    StreamingFailure(#[source] LinkError),

    #[error("Telemetry unavailable: {0}")]
    Telemetry(#[source] LinkError),

    #[error("{0} out of range")]
    OutOfRange(&'static str),

    #[error("Cancelled")]
    Cancelled,
}

impl ControlError {
    /// Wrap a failed action call.
    pub fn action(action: &'static str, err: LinkError) -> Self {
        ControlError::ActionRejected {
            action,
            reason: err.action_result(),
        }
    }

    /// True when the error only reports that the task was superseded.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ControlError::Cancelled)
    }
}
