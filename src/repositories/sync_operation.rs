//! # Sync Operation Repository
//!
//! Bookkeeping for product synchronization requests. Rows are created in the
//! `pending` state; nothing in this service executes them.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::models::sync_operation::{
    ActiveModel, Column, Entity as SyncOperation, Model, OPERATION_PRODUCTS_SYNC,
};

pub const STATUS_PENDING: &str = "pending";

/// Repository for sync operation database operations
#[derive(Debug, Clone)]
pub struct SyncOperationRepository {
    db: Arc<DatabaseConnection>,
}

impl SyncOperationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a pending product sync for the store.
    pub async fn record_pending(&self, store_id: &str, direction: &str) -> Result<Model> {
        let now = Utc::now().fixed_offset();

        let operation = ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id.to_string()),
            operation_type: Set(OPERATION_PRODUCTS_SYNC.to_string()),
            direction: Set(direction.to_string()),
            status: Set(STATUS_PENDING.to_string()),
            started_at: Set(now),
            completed_at: Set(None),
            created_at: Set(now),
        };

        let result = operation.insert(&*self.db).await?;

        tracing::info!(
            store_id = %store_id,
            operation_id = %result.id,
            direction = %result.direction,
            "Product sync recorded"
        );

        Ok(result)
    }

    /// Most recent operations for the store, newest first.
    pub async fn history(&self, store_id: &str, limit: u64) -> Result<Vec<Model>> {
        Ok(SyncOperation::find()
            .filter(Column::StoreId.eq(store_id))
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    pub async fn count_for_store(&self, store_id: &str) -> Result<u64> {
        Ok(SyncOperation::find()
            .filter(Column::StoreId.eq(store_id))
            .count(&*self.db)
            .await?)
    }
}
