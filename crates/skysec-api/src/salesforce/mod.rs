//! Salesforce-backed mission store
//!
//! Thin REST glue: every operation requests a fresh OAuth token, then issues
//! one SOQL query or one record PATCH. Nothing is cached and nothing is
//! retried.

pub mod auth;

pub use auth::{auth_diagnostics, AccessToken, AuthDiagnostics};

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use skysec_core::config::SalesforceConfig;
use skysec_core::mission::UNASSIGNED_ASSET;
use skysec_core::{Mission, MissionStore, MissionStoreError};

/// Custom object holding missions
pub const MISSION_OBJECT: &str = "Demo_Mission__c";

/// Field written by status updates
pub const STATUS_FIELD: &str = "Readiness_Status__c";

/// Salesforce client errors
#[derive(Debug, thiserror::Error)]
pub enum SalesforceError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid record id: {0}")]
    InvalidId(String),
}

impl From<SalesforceError> for MissionStoreError {
    fn from(err: SalesforceError) -> Self {
        match err {
            SalesforceError::MissingCredential(_) | SalesforceError::Auth { .. } => {
                MissionStoreError::Authentication(err.to_string())
            }
            SalesforceError::Network(msg) => MissionStoreError::Connection(msg),
            SalesforceError::Api { status, message } => {
                MissionStoreError::Rejected { status, message }
            }
            SalesforceError::InvalidId(id) => MissionStoreError::Rejected {
                status: 400,
                message: format!("invalid record id: {}", id),
            },
            SalesforceError::Parse(msg) => MissionStoreError::Decode(msg),
        }
    }
}

/// Salesforce REST client
pub struct SalesforceClient {
    config: SalesforceConfig,
    client: reqwest::Client,
}

impl SalesforceClient {
    /// Create a client with the configured request timeout
    pub fn new(config: SalesforceConfig) -> Result<Self, SalesforceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SalesforceError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SalesforceConfig {
        &self.config
    }

    /// Request a fresh access token
    pub async fn authenticate(&self) -> Result<AccessToken, SalesforceError> {
        auth::request_token(&self.client, &self.config).await
    }

    /// Run the credential diagnostics against the configured login URL
    pub async fn diagnose(&self) -> AuthDiagnostics {
        auth_diagnostics(&self.client, &self.config).await
    }

    /// SOQL used to list missions
    pub fn mission_query(&self) -> String {
        format!(
            "SELECT Id, Name, Region__c, {}, Assigned_Asset__r.Name FROM {} LIMIT {}",
            STATUS_FIELD, MISSION_OBJECT, self.config.query_limit
        )
    }

    /// Fetch missions, surfacing any failure
    pub async fn fetch_missions(&self) -> Result<Vec<Mission>, SalesforceError> {
        let token = self.authenticate().await?;
        let url = format!("{}/query", self.data_url(&token));

        let response = self
            .client
            .get(&url)
            .query(&[("q", self.mission_query())])
            .bearer_auth(token.bearer())
            .send()
            .await
            .map_err(|e| SalesforceError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SalesforceError::Parse(e.to_string()))?;

        Ok(body.records.into_iter().map(Mission::from).collect())
    }

    /// Set `Readiness_Status__c` on one mission record
    pub async fn update_status(&self, mission_id: &str, status: &str) -> Result<(), SalesforceError> {
        if mission_id.is_empty() || !mission_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SalesforceError::InvalidId(mission_id.to_string()));
        }

        let token = self.authenticate().await?;
        let url = format!(
            "{}/sobjects/{}/{}",
            self.data_url(&token),
            MISSION_OBJECT,
            mission_id
        );

        let response = self
            .client
            .patch(&url)
            .bearer_auth(token.bearer())
            .json(&json!({ "Readiness_Status__c": status }))
            .send()
            .await
            .map_err(|e| SalesforceError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    fn data_url(&self, token: &AccessToken) -> String {
        format!(
            "{}/services/data/{}",
            token.instance_url.trim_end_matches('/'),
            self.config.api_version
        )
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SalesforceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(SalesforceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MissionStore for SalesforceClient {
    fn name(&self) -> &str {
        "salesforce"
    }

    async fn active_missions(&self) -> Vec<Mission> {
        match self.fetch_missions().await {
            Ok(missions) => {
                tracing::debug!(count = missions.len(), "Fetched missions from Salesforce");
                missions
            }
            Err(e) => {
                tracing::warn!(error = %e, "Mission fetch failed, serving an empty list");
                Vec::new()
            }
        }
    }

    async fn update_mission_status(
        &self,
        mission_id: &str,
        status: &str,
    ) -> Result<(), MissionStoreError> {
        self.update_status(mission_id, status).await.map_err(|e| {
            tracing::warn!(mission_id = %mission_id, error = %e, "Mission update failed");
            MissionStoreError::from(e)
        })
    }
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("login_url", &self.config.login_url)
            .field("api_version", &self.config.api_version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<MissionRecord>,
}

#[derive(Debug, Deserialize)]
struct MissionRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Region__c", default)]
    region: Option<String>,
    #[serde(rename = "Readiness_Status__c", default)]
    status: Option<String>,
    #[serde(rename = "Assigned_Asset__r", default)]
    asset: Option<AssetRef>,
}

#[derive(Debug, Deserialize)]
struct AssetRef {
    #[serde(rename = "Name")]
    name: String,
}

impl From<MissionRecord> for Mission {
    fn from(record: MissionRecord) -> Self {
        Mission {
            id: record.id,
            mission_name: record.name,
            region: record.region.unwrap_or_default(),
            status: record.status.unwrap_or_default(),
            asset: record
                .asset
                .map(|a| a.name)
                .unwrap_or_else(|| UNASSIGNED_ASSET.to_string()),
            risk_assessment: None,
        }
    }
}
