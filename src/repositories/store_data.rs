//! Store-wide data removal
//!
//! Used by the store redaction webhook: every row the bridge holds for a
//! store is deleted in a single transaction, so a failure leaves the store's
//! data untouched.

use std::sync::Arc;

use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};

use crate::models::{ErpConfig, Installation, SyncOperation, sync_operation};

/// Rows removed by a store redaction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RedactedRows {
    pub installations: u64,
    pub erp_configs: u64,
    pub sync_operations: u64,
}

#[derive(Debug, Clone)]
pub struct StoreDataRepository {
    db: Arc<DatabaseConnection>,
}

impl StoreDataRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Deletes the store's installation, ERP settings and sync history.
    pub async fn redact(&self, store_id: &str) -> Result<RedactedRows> {
        let txn = self.db.begin().await?;

        let installations = Installation::delete_by_id(store_id.to_string())
            .exec(&txn)
            .await?
            .rows_affected;
        let erp_configs = ErpConfig::delete_by_id(store_id.to_string())
            .exec(&txn)
            .await?
            .rows_affected;
        let sync_operations = SyncOperation::delete_many()
            .filter(sync_operation::Column::StoreId.eq(store_id))
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;

        Ok(RedactedRows {
            installations,
            erp_configs,
            sync_operations,
        })
    }
}
