//! Liveness endpoint.

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::server::AppState;

/// Liveness report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub project: String,
    /// `ok` or `unavailable`
    pub database: String,
}

/// Reports that the service is up
#[utoipa::path(
    get,
    path = "/api/test",
    responses(
        (status = 200, description = "Service is running", body = HealthReport)
    ),
    tag = "health"
)]
pub async fn test_endpoint(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Json<HealthReport> {
    let database = match db::health_check(&state.db).await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            "unavailable"
        }
    };

    Json(HealthReport {
        status: "ok".to_string(),
        message: "ERP bridge is running".to_string(),
        timestamp: Utc::now(),
        method: method.to_string(),
        url: uri.to_string(),
        project: env!("CARGO_PKG_NAME").to_string(),
        database: database.to_string(),
    })
}
