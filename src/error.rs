// src/error.rs
//! Error types for location acquisition

use std::fmt;

pub type Result<T> = std::result::Result<T, LocationError>;

#[derive(Debug)]
pub enum LocationError {
    /// Neither source produced a location.
    Unavailable,
    /// A fresh single-shot update never arrived.
    NoKnownPosition,
    /// No built-in provider is enabled.
    ProviderDisabled,
    /// The fused service did not become ready in time. Folded into fallback.
    ConnectionTimeout,
    /// The caller abandoned the request.
    Cancelled,
    /// Message raised by the platform, passed through verbatim.
    Platform(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Connection(String),
    Config(String),
}

impl LocationError {
    /// Message handed back to the host bridge.
    pub fn bridge_message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::Unavailable => write!(f, "No last known positions."),
            LocationError::NoKnownPosition => write!(f, "No known position."),
            LocationError::ProviderDisabled => write!(f, "No provider enabled."),
            LocationError::ConnectionTimeout => {
                write!(f, "Location services connection timed out.")
            }
            LocationError::Cancelled => write!(f, "Location request cancelled."),
            LocationError::Platform(msg) => write!(f, "{}", msg),
            LocationError::Io(e) => write!(f, "IO error: {}", e),
            LocationError::Json(e) => write!(f, "JSON error: {}", e),
            LocationError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LocationError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for LocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocationError::Io(e) => Some(e),
            LocationError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LocationError {
    fn from(error: std::io::Error) -> Self {
        LocationError::Io(error)
    }
}

impl From<serde_json::Error> for LocationError {
    fn from(error: serde_json::Error) -> Self {
        LocationError::Json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_messages() {
        assert_eq!(LocationError::Unavailable.bridge_message(), "No last known positions.");
        assert_eq!(LocationError::NoKnownPosition.bridge_message(), "No known position.");
        assert_eq!(LocationError::ProviderDisabled.bridge_message(), "No provider enabled.");
    }

    #[test]
    fn test_platform_message_is_verbatim() {
        let err = LocationError::Platform("GoogleApiClient is not connected yet.".to_string());
        assert_eq!(err.bridge_message(), "GoogleApiClient is not connected yet.");
        assert_eq!(err.to_string(), "GoogleApiClient is not connected yet.");
    }
}
