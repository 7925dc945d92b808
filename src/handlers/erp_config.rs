//! # ERP Configuration Handlers
//!
//! Read and store the ERP connection settings of a store. The ERP token is
//! write-only: it is encrypted on the way in and never returned.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    response::Json,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};
use crate::handlers::types::{StoreQuery, SuccessResponse, require_store_id};
use crate::server::AppState;

/// Whether a store has ERP settings, and which
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErpConfigStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erp_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// ERP settings submitted by the app
#[derive(Deserialize, ToSchema)]
pub struct SaveErpConfigRequest {
    /// Base URL of the ERP API (http or https)
    pub erp_url: Option<String>,
    /// ERP API token
    pub erp_token: Option<String>,
}

/// Returns the store's ERP configuration status
#[utoipa::path(
    get,
    path = "/api/erp-config",
    params(StoreQuery),
    responses(
        (status = 200, description = "ERP configuration status", body = ErpConfigStatus),
        (status = 400, description = "store_id missing", body = ApiError)
    ),
    tag = "erp"
)]
pub async fn get_erp_config(
    State(state): State<AppState>,
    query: Result<Query<StoreQuery>, QueryRejection>,
) -> Result<Json<ErpConfigStatus>, ApiError> {
    let Query(query) = query?;
    let store_id = require_store_id(query.store_id.as_deref())?;

    let status = match state.erp_configs().find(&store_id).await? {
        Some(config) => ErpConfigStatus {
            configured: true,
            erp_url: Some(config.erp_url),
            created_at: Some(config.created_at.with_timezone(&Utc)),
        },
        None => ErpConfigStatus {
            configured: false,
            erp_url: None,
            created_at: None,
        },
    };

    Ok(Json(status))
}

/// Creates or replaces the store's ERP configuration
#[utoipa::path(
    post,
    path = "/api/erp-config",
    params(StoreQuery),
    request_body = SaveErpConfigRequest,
    responses(
        (status = 200, description = "Configuration saved", body = SuccessResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "erp"
)]
pub async fn save_erp_config(
    State(state): State<AppState>,
    query: Result<Query<StoreQuery>, QueryRejection>,
    payload: Result<Json<SaveErpConfigRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let store_id = require_store_id(query.store_id.as_deref())?;
    let Json(request) = payload?;

    let erp_url = request.erp_url.map(|v| v.trim().to_string()).unwrap_or_default();
    let erp_token = request.erp_token.unwrap_or_default();

    let mut field_errors = BTreeMap::new();
    if erp_url.is_empty() {
        field_errors.insert("erp_url", "Required field is missing");
    } else if !is_http_url(&erp_url) {
        field_errors.insert("erp_url", "Must be an http or https URL");
    }
    if erp_token.trim().is_empty() {
        field_errors.insert("erp_token", "Required field is missing");
    }
    if !field_errors.is_empty() {
        return Err(validation_error(
            "Invalid ERP configuration",
            json!(field_errors),
        ));
    }

    let saved = state
        .erp_configs()
        .upsert(&store_id, &erp_url, &SecretString::from(erp_token))
        .await?;

    tracing::info!(store_id = %store_id, erp_url = %saved.erp_url, "ERP configuration saved");

    Ok(Json(SuccessResponse::new("ERP configuration saved")))
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}
