use thiserror::Error;

/// Fatal specification errors, returned before any probing starts.
///
/// Everything that goes wrong *during* a scan is recovered locally and
/// mapped to a port or host state instead of being surfaced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("invalid target spec '{spec}': {reason}")]
    InvalidTargetSpec { spec: String, reason: String },

    #[error("invalid port spec '{spec}': {reason}")]
    InvalidPortSpec { spec: String, reason: String },
}

impl SpecError {
    pub fn target(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTargetSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ports(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPortSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
