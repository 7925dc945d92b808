//! # Product Sync Handlers
//!
//! Records requests to copy products from the store's ERP into the platform
//! and reports their history. Operations are only recorded here; no ERP
//! traffic happens in this service.

use axum::{
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, conflict, validation_error};
use crate::handlers::types::{StoreQuery, require_store_id, store_id_from_body};
use crate::models::sync_operation;
use crate::server::AppState;

/// The only supported copy direction.
pub const DIRECTION_ERP_TO_NUVEMSHOP: &str = "erp_to_nuvemshop";

/// Number of operations returned by the history view.
pub const HISTORY_LIMIT: u64 = 50;

/// Body of a sync request; every field is optional
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartSyncRequest {
    /// Store id, when not given in the query string (string or integer)
    #[schema(value_type = Option<String>)]
    pub store_id: Option<Value>,
    /// Copy direction, defaults to `erp_to_nuvemshop`
    pub direction: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncStartedResponse {
    pub success: bool,
    pub message: String,
    pub operation_id: Uuid,
    pub direction: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncHistoryEntry {
    pub id: Uuid,
    pub operation_type: String,
    pub direction: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<sync_operation::Model> for SyncHistoryEntry {
    fn from(model: sync_operation::Model) -> Self {
        Self {
            id: model.id,
            operation_type: model.operation_type,
            direction: model.direction,
            status: model.status,
            started_at: model.started_at.with_timezone(&Utc),
            completed_at: model.completed_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncHistoryResponse {
    pub success: bool,
    pub history: Vec<SyncHistoryEntry>,
}

/// Records a product synchronization request
#[utoipa::path(
    post,
    path = "/api/sync-products",
    params(StoreQuery),
    request_body(content = StartSyncRequest, description = "Optional sync options"),
    responses(
        (status = 200, description = "Sync operation recorded", body = SyncStartedResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Store has no ERP configuration", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn start_product_sync(
    State(state): State<AppState>,
    query: Result<Query<StoreQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<SyncStartedResponse>, ApiError> {
    let Query(query) = query?;
    let request = parse_sync_request(&body)?;

    let store_id = match query.store_id.as_deref() {
        Some(id) if !id.trim().is_empty() => require_store_id(Some(id))?,
        _ => store_id_from_body(request.store_id.as_ref())?,
    };

    let direction = request
        .direction
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DIRECTION_ERP_TO_NUVEMSHOP);
    if direction != DIRECTION_ERP_TO_NUVEMSHOP {
        return Err(validation_error(
            "Unsupported sync direction",
            json!({ "direction": format!("Only '{}' is supported", DIRECTION_ERP_TO_NUVEMSHOP) }),
        ));
    }

    if state.erp_configs().erp_token(&store_id).await?.is_none() {
        return Err(conflict("Store has no ERP configuration"));
    }

    let operation = state
        .sync_operations()
        .record_pending(&store_id, direction)
        .await?;

    Ok(Json(SyncStartedResponse {
        success: true,
        message: "Product synchronization recorded".to_string(),
        operation_id: operation.id,
        direction: operation.direction,
    }))
}

/// Lists the store's most recent sync operations
#[utoipa::path(
    get,
    path = "/api/sync-products",
    params(StoreQuery),
    responses(
        (status = 200, description = "Sync history, newest first", body = SyncHistoryResponse),
        (status = 400, description = "store_id missing", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync_history(
    State(state): State<AppState>,
    query: Result<Query<StoreQuery>, QueryRejection>,
) -> Result<Json<SyncHistoryResponse>, ApiError> {
    let Query(query) = query?;
    let store_id = require_store_id(query.store_id.as_deref())?;

    let history = state
        .sync_operations()
        .history(&store_id, HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(SyncHistoryEntry::from)
        .collect();

    Ok(Json(SyncHistoryResponse {
        success: true,
        history,
    }))
}

fn parse_sync_request(body: &[u8]) -> Result<StartSyncRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartSyncRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        validation_error(
            "Invalid JSON body",
            json!({ "body": err.to_string() }),
        )
    })
}
