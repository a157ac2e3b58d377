//! Error types for the SkySec core
//!
//! Structured errors for health aggregation, configuration loading and the
//! mission store seam.

use thiserror::Error;

/// Errors raised by the health aggregator
#[derive(Error, Debug)]
pub enum HealthError {
    /// The named service is not part of the registry
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Host telemetry could not be acquired
    #[error("Host sampling failed: {0}")]
    Sampling(String),
}

impl HealthError {
    /// Create a sampling error
    pub fn sampling(msg: impl Into<String>) -> Self {
        HealthError::Sampling(msg.into())
    }

    /// Check if this is a caller error (vs host failure)
    pub fn is_not_found(&self) -> bool {
        matches!(self, HealthError::ServiceNotFound(_))
    }
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("File error: {0}")]
    FileError(String),

    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A configuration value is outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Live mode was requested but is not supported by this build
    #[error("Live mode requires secure service discovery; set security.demo_mode = true")]
    LiveModeUnsupported,
}

impl ConfigError {
    /// Create an invalid configuration error
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(format!("TOML error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(format!("YAML error: {}", err))
    }
}

/// Errors surfaced by a mission store
#[derive(Error, Debug)]
pub enum MissionStoreError {
    /// Authentication against the upstream store failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The upstream store rejected the request
    #[error("Upstream rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The upstream response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, HealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HealthError::ServiceNotFound("Nonexistent".to_string());
        assert_eq!(err.to_string(), "Service not found: Nonexistent");

        let err = MissionStoreError::Rejected {
            status: 400,
            message: "MALFORMED_ID".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream rejected request (400): MALFORMED_ID");
    }

    #[test]
    fn test_is_not_found() {
        assert!(HealthError::ServiceNotFound("x".to_string()).is_not_found());
        assert!(!HealthError::sampling("no /proc").is_not_found());
    }

    #[test]
    fn test_config_error_constructors() {
        let err = ConfigError::invalid("debounce_limit must be at least 1");
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(ConfigError::LiveModeUnsupported
            .to_string()
            .contains("secure service discovery"));
    }
}
