//! SkySec Core
//!
//! Domain logic behind the SkySec unified command API.
//!
//! ## Modules
//!
//! - **Risk** (`risk`): composite risk scoring for mission readiness states
//! - **Health** (`health`): service registry, hardware debounce and readiness
//!   provenance tracking
//! - **Mission** (`mission`): mission records and the `MissionStore` seam used
//!   by the CRM connector
//! - **Config** (`config`): file + environment configuration with fail-fast
//!   validation
//!
//! ## Example
//!
//! ```rust
//! use skysec_core::risk::{calculate_risk_score, RiskLevel};
//!
//! let assessment = calculate_risk_score("NOT_READY", 3);
//! assert_eq!(assessment.score, 81.0);
//! assert_eq!(assessment.risk_level, RiskLevel::Critical);
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod mission;
pub mod risk;

pub use config::SkysecConfig;
pub use error::{ConfigError, HealthError, MissionStoreError};
pub use health::{HealthAggregator, HealthSnapshot, Readiness, TransitionRecord};
pub use mission::{Mission, MissionStore};
pub use risk::{calculate_risk_score, RiskAssessment, RiskLevel};

/// Service version (from Cargo.toml)
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identifier
pub const SERVICE_NAME: &str = "skysec-unified-command";
