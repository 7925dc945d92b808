//! # Installation Handshake
//!
//! Exchanges the one-time authorization code the platform hands to the
//! callback for a permanent store access token, validates the response and
//! produces an [`InstallationRecord`].
//!
//! The exchange performs exactly one outbound request per invocation and has
//! no side effects beyond it. Persisting the record is the caller's job.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;
use crate::error::body_excerpt;

const GRANT_TYPE: &str = "authorization_code";
const MASK_PREFIX_LEN: usize = 8;

/// Inbound callback parameters.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    /// One-time authorization code issued by the platform
    pub code: Option<String>,
    /// Opaque value passed through unmodified
    pub state: Option<String>,
}

/// Application credentials registered with the platform.
#[derive(Debug, Clone)]
pub struct TokenExchangeCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Lifecycle status of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationStatus {
    Active,
    Revoked,
    Expired,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationStatus::Active => "active",
            InstallationStatus::Revoked => "revoked",
            InstallationStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(InstallationStatus::Active),
            "revoked" => Ok(InstallationStatus::Revoked),
            "expired" => Ok(InstallationStatus::Expired),
            other => Err(format!("unknown installation status '{other}'")),
        }
    }
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone)]
pub struct InstallationRecord {
    /// Platform store identifier (`user_id` in the token response)
    pub store_id: String,
    pub access_token: SecretString,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub status: InstallationStatus,
    /// `state` echoed from the authorization request
    pub state: Option<String>,
    /// Client id of the installed app
    pub app_id: String,
}

/// Failures of the installation handshake. All are terminal for the attempt.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("authorization code is missing")]
    MissingAuthorizationCode,
    #[error("token endpoint unreachable: {reason}")]
    TokenEndpointUnreachable { reason: String },
    #[error("token endpoint returned a non-JSON response (status {status})")]
    MalformedTokenResponse { status: u16, body_excerpt: String },
    #[error("token endpoint rejected the exchange (status {status})")]
    TokenEndpointRejected { status: u16, body: Value },
    #[error("token response did not include an access token")]
    AccessTokenMissing,
    #[error("token response did not include a store id")]
    StoreIdMissing,
}

impl HandshakeError {
    /// Stable identifier used in logs, metrics and result pages.
    pub fn code(&self) -> &'static str {
        match self {
            HandshakeError::MissingAuthorizationCode => "MISSING_AUTHORIZATION_CODE",
            HandshakeError::TokenEndpointUnreachable { .. } => "TOKEN_ENDPOINT_UNREACHABLE",
            HandshakeError::MalformedTokenResponse { .. } => "MALFORMED_TOKEN_RESPONSE",
            HandshakeError::TokenEndpointRejected { .. } => "TOKEN_ENDPOINT_REJECTED",
            HandshakeError::AccessTokenMissing => "ACCESS_TOKEN_MISSING",
            HandshakeError::StoreIdMissing => "STORE_ID_MISSING",
        }
    }

    /// True when the merchant can fix the problem by restarting the installation.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, HandshakeError::MissingAuthorizationCode)
    }
}

/// Masks an access token for logging: the first 8 characters followed by
/// `...`, or `***` when the token is too short to reveal any of it.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= MASK_PREFIX_LEN {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(MASK_PREFIX_LEN).collect();
    format!("{prefix}...")
}

/// Client for the platform's authorization-code token endpoint.
#[derive(Debug, Clone)]
pub struct InstallationHandshake {
    client: Client,
    token_url: Url,
}

impl InstallationHandshake {
    /// Builds a handshake client with a bounded request timeout.
    pub fn new(token_url: Url, timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, token_url })
    }

    /// Builds a handshake client from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let token_url = Url::parse(&config.nuvemshop_token_url)?;
        Ok(Self::new(
            token_url,
            config.token_exchange_timeout(),
            &config.http_user_agent,
        )?)
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Exchanges the authorization code for an access token.
    pub async fn exchange(
        &self,
        request: &AuthorizationRequest,
        credentials: &TokenExchangeCredentials,
    ) -> Result<InstallationRecord, HandshakeError> {
        let result = self.exchange_inner(request, credentials).await;

        match &result {
            Ok(record) => {
                counter!("installation_handshake_total", "outcome" => "success").increment(1);
                tracing::info!(
                    store_id = %record.store_id,
                    scope = record.scope.as_deref().unwrap_or_default(),
                    token_type = record.token_type.as_deref().unwrap_or_default(),
                    access_token_prefix = %mask_token(record.access_token.expose_secret()),
                    "Installation handshake succeeded"
                );
            }
            Err(err) => {
                counter!("installation_handshake_total", "outcome" => err.code()).increment(1);
                match err {
                    HandshakeError::MissingAuthorizationCode => {
                        tracing::info!(code = err.code(), "Callback received without authorization code");
                    }
                    HandshakeError::MalformedTokenResponse {
                        status,
                        body_excerpt,
                    } => {
                        tracing::warn!(code = err.code(), status, body_excerpt = %body_excerpt, "Token endpoint returned malformed response");
                    }
                    HandshakeError::TokenEndpointRejected { status, body } => {
                        let upstream_error =
                            body.get("error").and_then(Value::as_str).unwrap_or_default();
                        tracing::warn!(
                            code = err.code(),
                            status,
                            upstream_error,
                            "Token endpoint rejected authorization code"
                        );
                    }
                    _ => {
                        tracing::warn!(code = err.code(), error = %err, "Installation handshake failed");
                    }
                }
            }
        }

        result
    }

    async fn exchange_inner(
        &self,
        request: &AuthorizationRequest,
        credentials: &TokenExchangeCredentials,
    ) -> Result<InstallationRecord, HandshakeError> {
        let code = request
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or(HandshakeError::MissingAuthorizationCode)?;

        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("grant_type", GRANT_TYPE),
            ("code", code),
        ];

        tracing::debug!(token_url = %self.token_url, "Exchanging authorization code");

        let response = self
            .client
            .post(self.token_url.clone())
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(unreachable)?;

        let payload = match serde_json::from_str::<Value>(&body) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                return Err(HandshakeError::MalformedTokenResponse {
                    status: status.as_u16(),
                    body_excerpt: body_excerpt(&body),
                });
            }
        };

        if !status.is_success() {
            return Err(HandshakeError::TokenEndpointRejected {
                status: status.as_u16(),
                body: payload,
            });
        }

        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or(HandshakeError::AccessTokenMissing)?;

        let store_id = payload
            .get("user_id")
            .and_then(store_id_from_value)
            .ok_or(HandshakeError::StoreIdMissing)?;

        Ok(InstallationRecord {
            store_id,
            access_token: SecretString::from(access_token),
            scope: optional_string(&payload, "scope"),
            token_type: optional_string(&payload, "token_type"),
            installed_at: Utc::now(),
            status: InstallationStatus::Active,
            state: request.state.clone(),
            app_id: credentials.client_id.clone(),
        })
    }
}

fn unreachable(err: reqwest::Error) -> HandshakeError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.without_url().to_string()
    };
    HandshakeError::TokenEndpointUnreachable { reason }
}

/// Accepts the store id as a non-empty string or an integer.
pub(crate) fn store_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn optional_string(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
