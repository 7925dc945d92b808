//! # Common API Types
//!
//! Shared request and response types used across the JSON handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};
use crate::handshake::store_id_from_value;

/// `store_id` query parameter carried by the store-scoped endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StoreQuery {
    /// Platform store identifier
    pub store_id: Option<String>,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Returns the trimmed store id or a 400 naming the missing parameter.
pub fn require_store_id(store_id: Option<&str>) -> Result<String, ApiError> {
    store_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            validation_error(
                "store_id is required",
                json!({ "store_id": "Required parameter is missing" }),
            )
        })
}

/// Store id from a JSON body field, which may be a string or an integer.
pub fn store_id_from_body(value: Option<&Value>) -> Result<String, ApiError> {
    value.and_then(store_id_from_value).ok_or_else(|| {
        validation_error(
            "store_id is required",
            json!({ "store_id": "Required field is missing" }),
        )
    })
}
