//! OAuth 2.0 password grant and credential diagnostics

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use skysec_core::config::SalesforceConfig;

use super::SalesforceError;

/// Bearer token plus the instance it is valid for
#[derive(Deserialize)]
pub struct AccessToken {
    access_token: SecretString,
    pub instance_url: String,
}

impl AccessToken {
    pub fn bearer(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .finish()
    }
}

/// Endpoint for the password grant
pub fn token_url(config: &SalesforceConfig) -> String {
    format!(
        "{}/services/oauth2/token",
        config.login_url.trim_end_matches('/')
    )
}

/// Form fields for the password grant; the password is password + security token
fn grant_form(config: &SalesforceConfig) -> Result<Vec<(&'static str, String)>, SalesforceError> {
    let username = config
        .username
        .as_deref()
        .ok_or(SalesforceError::MissingCredential("SF_USERNAME"))?;
    let password = required(&config.password, "SF_PASSWORD")?;
    let consumer_key = required(&config.consumer_key, "SF_CONSUMER_KEY")?;
    let consumer_secret = required(&config.consumer_secret, "SF_CONSUMER_SECRET")?;
    let token = config
        .security_token
        .as_ref()
        .map(|t| t.expose_secret().as_str())
        .unwrap_or("");

    Ok(vec![
        ("grant_type", "password".to_string()),
        ("client_id", consumer_key.to_string()),
        ("client_secret", consumer_secret.to_string()),
        ("username", username.to_string()),
        ("password", format!("{}{}", password, token)),
    ])
}

fn required<'a>(
    value: &'a Option<SecretString>,
    name: &'static str,
) -> Result<&'a str, SalesforceError> {
    value
        .as_ref()
        .map(|v| v.expose_secret().as_str())
        .ok_or(SalesforceError::MissingCredential(name))
}

/// Request a fresh access token
pub async fn request_token(
    client: &reqwest::Client,
    config: &SalesforceConfig,
) -> Result<AccessToken, SalesforceError> {
    let form = grant_form(config)?;

    let response = client
        .post(token_url(config))
        .form(&form)
        .send()
        .await
        .map_err(|e| SalesforceError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SalesforceError::Auth {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<AccessToken>()
        .await
        .map_err(|e| SalesforceError::Parse(e.to_string()))
}

/// Outcome of `skysec auth-check`
#[derive(Debug, Clone, Serialize)]
pub struct AuthDiagnostics {
    pub token_url: String,
    pub username: Option<String>,
    pub consumer_key_length: Option<usize>,
    pub consumer_secret_length: Option<usize>,
    /// Problems spotted in the configured values
    pub warnings: Vec<String>,
    /// HTTP status of the token request, if one was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Upstream body on failure, or the transport error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub success: bool,
}

/// Check configured credentials and attempt one raw token request.
///
/// Credential values are never reported, only their lengths.
pub async fn auth_diagnostics(
    client: &reqwest::Client,
    config: &SalesforceConfig,
) -> AuthDiagnostics {
    let secret_len = |s: &Option<SecretString>| s.as_ref().map(|v| v.expose_secret().len());

    let mut report = AuthDiagnostics {
        token_url: token_url(config),
        username: config.username.clone(),
        consumer_key_length: secret_len(&config.consumer_key),
        consumer_secret_length: secret_len(&config.consumer_secret),
        warnings: Vec::new(),
        status: None,
        response: None,
        success: false,
    };

    if let Some(username) = &config.username {
        if is_quoted(username) {
            report.warnings.push("SF_USERNAME is wrapped in quotes".to_string());
        }
    }
    for (name, value) in [
        ("SF_PASSWORD", &config.password),
        ("SF_TOKEN", &config.security_token),
        ("SF_CONSUMER_KEY", &config.consumer_key),
        ("SF_CONSUMER_SECRET", &config.consumer_secret),
    ] {
        if let Some(v) = value {
            if is_quoted(v.expose_secret()) {
                report.warnings.push(format!("{} is wrapped in quotes", name));
            }
        }
    }

    let form = match grant_form(config) {
        Ok(form) => form,
        Err(e) => {
            report.warnings.push(e.to_string());
            return report;
        }
    };

    match client.post(&report.token_url).form(&form).send().await {
        Ok(response) => {
            let status = response.status();
            report.status = Some(status.as_u16());
            report.success = status.is_success();
            if !report.success {
                report.response = Some(response.text().await.unwrap_or_default());
            }
        }
        Err(e) => report.response = Some(e.to_string()),
    }

    tracing::info!(
        success = report.success,
        status = ?report.status,
        warnings = report.warnings.len(),
        "Salesforce credential diagnostics complete"
    );
    report
}

fn is_quoted(value: &str) -> bool {
    const QUOTES: [char; 2] = ['"', '\''];
    let trimmed = value.trim();
    trimmed.starts_with(QUOTES) || trimmed.ends_with(QUOTES)
}
