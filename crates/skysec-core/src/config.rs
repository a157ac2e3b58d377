//! Service configuration
//!
//! Loaded from an optional TOML or YAML file, then overridden from the
//! environment, then validated. Validation fails fast with a descriptive
//! [`ConfigError`] instead of letting a bad value surface at request time.
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SF_USERNAME` | `salesforce.username` |
//! | `SF_PASSWORD` | `salesforce.password` |
//! | `SF_TOKEN` | `salesforce.security_token` |
//! | `SF_CONSUMER_KEY` | `salesforce.consumer_key` |
//! | `SF_CONSUMER_SECRET` | `salesforce.consumer_secret` |
//! | `SKYSEC_CONTROL_SECRET` | `security.control_secret` |
//! | `SKYSEC_DEMO_MODE` | `security.demo_mode` |
//! | `SKYSEC_AUDIT_LOG` | `audit.log_file` |
//! | `SKYSEC_STATIC_DIR` | `server.static_dir` |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkysecConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub health: HealthConfig,
    pub audit: AuditConfig,
    pub missions: MissionConfig,
    pub salesforce: SalesforceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Dashboard assets; `index.html` is served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret required in the `X-Control-Secret` header
    pub control_secret: Option<SecretString>,
    /// Simulation mode; live mode is rejected at startup
    pub demo_mode: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            control_secret: None,
            demo_mode: true,
        }
    }
}

/// A service registered at startup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    #[serde(default)]
    pub critical: bool,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            critical,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    /// Consecutive breaching samples before a metric degrades readiness
    pub debounce_limit: u32,
    pub services: Vec<ServiceSpec>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 90.0,
            memory_threshold: 95.0,
            debounce_limit: 3,
            services: vec![
                ServiceSpec::new("MCx Core", true),
                ServiceSpec::new("Video Gateway", false),
                ServiceSpec::new("Secure Uplink", true),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub log_file: PathBuf,
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("audit.log"),
            retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Asset complexity used when scoring missions
    pub default_complexity: i64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            default_complexity: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub query_limit: u32,
    pub timeout_ms: u64,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub security_token: Option<SecretString>,
    pub consumer_key: Option<SecretString>,
    pub consumer_secret: Option<SecretString>,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: "https://login.salesforce.com".to_string(),
            api_version: "v59.0".to_string(),
            query_limit: 10,
            timeout_ms: 10_000,
            username: None,
            password: None,
            security_token: None,
            consumer_key: None,
            consumer_secret: None,
        }
    }
}

impl SalesforceConfig {
    /// Whether every credential needed for the password grant is present
    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
            && self.password.is_some()
            && self.consumer_key.is_some()
            && self.consumer_secret.is_some()
    }
}

impl SkysecConfig {
    /// Load configuration: file (if given), then process environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::resolve(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but without requiring the control secret.
    ///
    /// Used by the offline commands (status, purge, auth-check) that never
    /// expose the control endpoint.
    pub fn load_offline(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::resolve(path)?;
        config.validate_settings()?;
        Ok(config)
    }

    fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file; `.yaml`/`.yml` are YAML, anything else TOML
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(toml::from_str(&content)?),
        }
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| lookup(key).map(SecretString::new);

        if let Some(v) = lookup("SF_USERNAME") {
            self.salesforce.username = Some(v);
        }
        if let Some(v) = secret("SF_PASSWORD") {
            self.salesforce.password = Some(v);
        }
        if let Some(v) = secret("SF_TOKEN") {
            self.salesforce.security_token = Some(v);
        }
        if let Some(v) = secret("SF_CONSUMER_KEY") {
            self.salesforce.consumer_key = Some(v);
        }
        if let Some(v) = secret("SF_CONSUMER_SECRET") {
            self.salesforce.consumer_secret = Some(v);
        }
        if let Some(v) = secret("SKYSEC_CONTROL_SECRET") {
            self.security.control_secret = Some(v);
        }
        if let Some(v) = lookup("SKYSEC_DEMO_MODE") {
            self.security.demo_mode = !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(v) = lookup("SKYSEC_AUDIT_LOG") {
            self.audit.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SKYSEC_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(v));
        }
    }

    /// Check invariants that the service relies on at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_settings()?;

        match &self.security.control_secret {
            Some(s) if !s.expose_secret().trim().is_empty() => Ok(()),
            _ => Err(ConfigError::invalid(
                "security.control_secret must be set (SKYSEC_CONTROL_SECRET)",
            )),
        }
    }

    /// Everything [`validate`](Self::validate) checks except the control secret
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if !self.security.demo_mode {
            return Err(ConfigError::LiveModeUnsupported);
        }

        for (name, value) in [
            ("health.cpu_threshold", self.health.cpu_threshold),
            ("health.memory_threshold", self.health.memory_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::invalid(format!(
                    "{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }

        if self.health.debounce_limit == 0 {
            return Err(ConfigError::invalid("health.debounce_limit must be at least 1"));
        }

        let mut seen = HashSet::new();
        for service in &self.health.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::invalid("health.services entries need a name"));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate service name: {}",
                    service.name
                )));
            }
        }

        if self.audit.retention_days == 0 {
            return Err(ConfigError::invalid("audit.retention_days must be at least 1"));
        }

        if self.salesforce.query_limit == 0 {
            return Err(ConfigError::invalid("salesforce.query_limit must be at least 1"));
        }

        Ok(())
    }
}
