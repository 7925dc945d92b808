//! # Installation Callback
//!
//! The platform redirects the merchant here with a one-time authorization
//! code after they approve the app. The handler runs the handshake, stores
//! the resulting installation and renders a result page.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::SecondsFormat;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::handshake::{AuthorizationRequest, HandshakeError, InstallationRecord};
use crate::server::AppState;
use crate::telemetry;

const DEFAULT_TOKEN_TYPE: &str = "bearer";
const DEFAULT_SCOPE: &str = "default permissions";

/// Query parameters the platform appends to the callback URL
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// One-time authorization code
    pub code: Option<String>,
    /// Opaque state value, passed through unmodified
    pub state: Option<String>,
}

#[derive(Template)]
#[template(path = "install_success.html")]
struct InstallSuccessPage<'a> {
    store_id: &'a str,
    token_type: &'a str,
    scope: &'a str,
    installed_at: String,
    app_id: &'a str,
    store_home_url: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "install_error.html")]
struct InstallErrorPage<'a> {
    message: &'a str,
    error_code: &'a str,
    retry_install: bool,
    trace_id: Option<String>,
    admin_url: &'a str,
}

/// Completes an app installation
#[utoipa::path(
    get,
    path = "/api/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Installation stored; success page", body = String, content_type = "text/html"),
        (status = 400, description = "Authorization code missing; merchant should restart the installation", body = String, content_type = "text/html"),
        (status = 500, description = "Installation could not be stored or the app is not configured", body = String, content_type = "text/html"),
        (status = 502, description = "Token exchange with the platform failed", body = String, content_type = "text/html")
    ),
    tag = "installation"
)]
pub async fn installation_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let admin_url = state.config.admin_url.as_str();

    let Some(credentials) = state.credentials.as_ref() else {
        tracing::error!("Installation callback received but client credentials are not configured");
        return error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CREDENTIALS_NOT_CONFIGURED",
            "The app is not configured to complete installations.",
            false,
            admin_url,
        );
    };

    let request = AuthorizationRequest {
        code: query.code,
        state: query.state,
    };

    let record = match state.handshake.exchange(&request, credentials).await {
        Ok(record) => record,
        Err(err) => {
            let status = if err.is_user_correctable() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            return error_page(
                status,
                err.code(),
                failure_message(&err),
                err.is_user_correctable(),
                admin_url,
            );
        }
    };

    if let Err(err) = state.installations.save(&record).await {
        tracing::error!(store_id = %record.store_id, error = %err, "Failed to persist installation");
        return error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INSTALLATION_NOT_SAVED",
            "The installation succeeded but could not be saved.",
            false,
            admin_url,
        );
    }

    success_page(&record, &state)
}

fn failure_message(err: &HandshakeError) -> &'static str {
    match err {
        HandshakeError::MissingAuthorizationCode => {
            "The authorization code is missing from the installation link."
        }
        HandshakeError::TokenEndpointUnreachable { .. } => {
            "The store platform could not be reached to complete the installation."
        }
        HandshakeError::TokenEndpointRejected { .. } => {
            "The store platform rejected the installation request."
        }
        HandshakeError::MalformedTokenResponse { .. }
        | HandshakeError::AccessTokenMissing
        | HandshakeError::StoreIdMissing => {
            "The store platform returned an unexpected response."
        }
    }
}

fn success_page(record: &InstallationRecord, state: &AppState) -> Response {
    let page = InstallSuccessPage {
        store_id: &record.store_id,
        token_type: record.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE),
        scope: record.scope.as_deref().unwrap_or(DEFAULT_SCOPE),
        installed_at: record
            .installed_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        app_id: &record.app_id,
        store_home_url: &state.config.store_home_url,
        admin_url: &state.config.admin_url,
    };
    render(StatusCode::OK, &page)
}

fn error_page(
    status: StatusCode,
    error_code: &str,
    message: &str,
    retry_install: bool,
    admin_url: &str,
) -> Response {
    let page = InstallErrorPage {
        message,
        error_code,
        retry_install,
        trace_id: telemetry::current_trace_id(),
        admin_url,
    };
    render(status, &page)
}

pub(crate) fn render<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_page_escapes_and_reports_code() {
        let page = InstallErrorPage {
            message: "<script>alert(1)</script>",
            error_code: "TOKEN_ENDPOINT_REJECTED",
            retry_install: false,
            trace_id: Some("req-1".to_string()),
            admin_url: "https://admin.nuvemshop.com.br",
        };
        let html = page.render().unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("TOKEN_ENDPOINT_REJECTED"));
        assert!(html.contains("req-1"));
        assert!(html.contains("contact support"));
    }

    #[test]
    fn missing_code_page_asks_for_restart() {
        let page = InstallErrorPage {
            message: failure_message(&HandshakeError::MissingAuthorizationCode),
            error_code: "MISSING_AUTHORIZATION_CODE",
            retry_install: true,
            trace_id: None,
            admin_url: "https://admin.nuvemshop.com.br",
        };
        let html = page.render().unwrap();

        assert!(html.contains("restart the installation"));
        assert!(!html.contains("contact support"));
    }

    #[test]
    fn success_page_lists_installation_details() {
        let page = InstallSuccessPage {
            store_id: "123456",
            token_type: DEFAULT_TOKEN_TYPE,
            scope: DEFAULT_SCOPE,
            installed_at: "2025-06-02T12:00:00Z".to_string(),
            app_id: "19190",
            store_home_url: "https://www.nuvemshop.com.br",
            admin_url: "https://admin.nuvemshop.com.br",
        };
        let html = page.render().unwrap();

        for expected in ["123456", "bearer", "default permissions", "2025-06-02T12:00:00Z", "19190"] {
            assert!(html.contains(expected), "missing {expected}");
        }
    }
}
