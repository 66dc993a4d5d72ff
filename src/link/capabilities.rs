/// Optional vehicle features probed before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Absolute gimbal pitch/yaw setpoints.
    GimbalAngle,
    /// Gimbal pitch/yaw rate setpoints.
    GimbalRate,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::GimbalAngle => "gimbal-angle",
            Capability::GimbalRate => "gimbal-rate",
        }
    }
}

/// Result of a capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitySupport {
    Supported,
    Unsupported,
    /// The probe itself failed.
    Error(String),
}

impl CapabilitySupport {
    pub fn is_supported(&self) -> bool {
        matches!(self, CapabilitySupport::Supported)
    }
}
