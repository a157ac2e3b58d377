//! SkySec Unified Command API
//!
//! HTTP surface for mission readiness: Salesforce-backed mission listing with
//! risk enrichment, status updates, a simulated system health dashboard and
//! service toggles. Every sensitive action is written to the compliance
//! audit log.
//!
//! ## Modules
//!
//! - `handler`: axum router, shared state and endpoint handlers
//! - `salesforce`: OAuth password grant and REST client implementing
//!   [`skysec_core::MissionStore`]
//! - `telemetry`: Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skysec_api::handler::{create_router, AppState};
//! use skysec_core::SkysecConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SkysecConfig::load(None)?;
//! let state = Arc::new(AppState::from_config(&config)?);
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod salesforce;
pub mod telemetry;

pub use handler::{create_router, ApiError, AppState};
pub use salesforce::{SalesforceClient, SalesforceError};
pub use telemetry::ApiMetrics;
