//! # Privacy Webhook Handlers
//!
//! Data-privacy (LGPD) webhooks the platform sends when a store uninstalls
//! the app or a customer exercises their data rights.
//!
//! Request signatures are not verified; every call is logged with
//! `signature_verified = false`.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};
use crate::handlers::types::store_id_from_body;
use crate::handshake::store_id_from_value;
use crate::server::AppState;

const RETENTION_POLICY: &str = "Store data is kept while the app is installed and deleted when the store-redact webhook is received.";

/// `store/redact` payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct StoreRedactRequest {
    #[schema(value_type = String)]
    pub store_id: Option<Value>,
}

/// Customer reference inside customer webhooks
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerRef {
    #[schema(value_type = String)]
    pub id: Option<Value>,
    pub email: Option<String>,
}

/// `customers/redact` payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerRedactRequest {
    #[schema(value_type = String)]
    pub store_id: Option<Value>,
    pub customer: Option<CustomerRef>,
}

/// `customers/data_request` payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerDataRequest {
    #[schema(value_type = String)]
    pub store_id: Option<Value>,
    pub customer: Option<CustomerRef>,
    #[schema(value_type = Object)]
    pub data_request: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreRedactResponse {
    pub success: bool,
    pub message: String,
    pub store_id: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerRedactResponse {
    pub success: bool,
    pub message: String,
    pub customer_id: String,
    pub store_id: String,
    pub deleted_at: DateTime<Utc>,
}

/// What the bridge holds about a store
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataReport {
    pub store_id: String,
    pub customer_id: String,
    pub customer_data_held: bool,
    pub installation_present: bool,
    pub erp_configured: bool,
    pub sync_operation_count: u64,
    pub data_categories: Vec<String>,
    pub retention_policy: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerDataResponse {
    pub success: bool,
    pub message: String,
    pub customer_id: String,
    pub store_id: String,
    pub data_report: DataReport,
    pub generated_at: DateTime<Utc>,
}

fn customer_id(customer: Option<&CustomerRef>) -> Result<String, ApiError> {
    customer
        .and_then(|c| c.id.as_ref())
        .and_then(store_id_from_value)
        .ok_or_else(|| {
            validation_error(
                "customer.id is required",
                json!({ "customer": "Required field is missing" }),
            )
        })
}

/// Deletes everything stored for a store
#[utoipa::path(
    post,
    path = "/api/webhooks/store-redact",
    request_body = StoreRedactRequest,
    responses(
        (status = 200, description = "Store data deleted", body = StoreRedactResponse),
        (status = 400, description = "store_id missing", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn store_redact(
    State(state): State<AppState>,
    payload: Result<Json<StoreRedactRequest>, JsonRejection>,
) -> Result<Json<StoreRedactResponse>, ApiError> {
    let Json(request) = payload?;
    let store_id = store_id_from_body(request.store_id.as_ref())?;

    let removed = state.store_data().redact(&store_id).await?;

    tracing::info!(
        webhook = "store/redact",
        signature_verified = false,
        store_id = %store_id,
        installations = removed.installations,
        erp_configs = removed.erp_configs,
        sync_operations = removed.sync_operations,
        "Store data redacted"
    );

    Ok(Json(StoreRedactResponse {
        success: true,
        message: "Store data deleted".to_string(),
        store_id,
        deleted_at: Utc::now(),
    }))
}

/// Acknowledges a customer redaction request
#[utoipa::path(
    post,
    path = "/api/webhooks/customers-redact",
    request_body = CustomerRedactRequest,
    responses(
        (status = 200, description = "Customer redaction acknowledged", body = CustomerRedactResponse),
        (status = 400, description = "Required fields missing", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn customers_redact(
    payload: Result<Json<CustomerRedactRequest>, JsonRejection>,
) -> Result<Json<CustomerRedactResponse>, ApiError> {
    let Json(request) = payload?;
    let store_id = store_id_from_body(request.store_id.as_ref())?;
    let customer_id = customer_id(request.customer.as_ref())?;

    // No customer-level rows exist, so there is nothing to delete.
    tracing::info!(
        webhook = "customers/redact",
        signature_verified = false,
        store_id = %store_id,
        customer_id = %customer_id,
        "Customer redaction acknowledged"
    );

    Ok(Json(CustomerRedactResponse {
        success: true,
        message: "No customer data is stored for this customer".to_string(),
        customer_id,
        store_id,
        deleted_at: Utc::now(),
    }))
}

/// Reports the data held for a customer's store
#[utoipa::path(
    post,
    path = "/api/webhooks/customers-data-request",
    request_body = CustomerDataRequest,
    responses(
        (status = 200, description = "Data report", body = CustomerDataResponse),
        (status = 400, description = "Required fields missing", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn customers_data_request(
    State(state): State<AppState>,
    payload: Result<Json<CustomerDataRequest>, JsonRejection>,
) -> Result<Json<CustomerDataResponse>, ApiError> {
    let Json(request) = payload?;
    let store_id = store_id_from_body(request.store_id.as_ref())?;
    let customer_id = customer_id(request.customer.as_ref())?;
    if request.data_request.as_ref().is_none_or(Value::is_null) {
        return Err(validation_error(
            "data_request is required",
            json!({ "data_request": "Required field is missing" }),
        ));
    }

    let installation_present = state.installation_repository().exists(&store_id).await?;
    let erp_configured = state.erp_configs().find(&store_id).await?.is_some();
    let sync_operation_count = state.sync_operations().count_for_store(&store_id).await?;

    let mut data_categories = Vec::new();
    if installation_present {
        data_categories.push("store installation and encrypted platform access token".to_string());
    }
    if erp_configured {
        data_categories.push("ERP URL and encrypted ERP token".to_string());
    }
    if sync_operation_count > 0 {
        data_categories.push("product sync history".to_string());
    }

    tracing::info!(
        webhook = "customers/data_request",
        signature_verified = false,
        store_id = %store_id,
        customer_id = %customer_id,
        "Customer data report generated"
    );

    Ok(Json(CustomerDataResponse {
        success: true,
        message: "Data report generated".to_string(),
        customer_id: customer_id.clone(),
        store_id: store_id.clone(),
        data_report: DataReport {
            store_id,
            customer_id,
            customer_data_held: false,
            installation_present,
            erp_configured,
            sync_operation_count,
            data_categories,
            retention_policy: RETENTION_POLICY.to_string(),
        },
        generated_at: Utc::now(),
    }))
}
