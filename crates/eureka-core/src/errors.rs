use std::fmt;

/// Status code carried by every resolution failure.
pub const SERVICE_UNAVAILABLE: u16 = 503;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotInCache,
    NoInstancesLeft,
    InstanceDown,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            UnavailableReason::NotInCache => "app is not in cache",
            UnavailableReason::NoInstancesLeft => "app has no available instances",
            UnavailableReason::InstanceDown => "app is down",
        };
        f.write_str(reason)
    }
}

/// Resolution of an application name to an address failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Service unavailable: {app}: {reason}")]
pub struct ServiceUnavailable {
    pub app: String,
    pub reason: UnavailableReason,
}

impl ServiceUnavailable {
    pub fn new(app: impl Into<String>, reason: UnavailableReason) -> Self {
        Self {
            app: app.into(),
            reason,
        }
    }

    pub fn status_code(&self) -> u16 {
        SERVICE_UNAVAILABLE
    }
}

/// Misconfiguration detected while building a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required option `{0}`")]
    Missing(&'static str),

    #[error("Invalid value for `{option}`: {reason}")]
    Invalid { option: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            option,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_carries_503_and_reason() {
        let err = ServiceUnavailable::new("billing", UnavailableReason::InstanceDown);
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "Service unavailable: billing: app is down");
    }
}
