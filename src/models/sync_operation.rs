//! Sync operation entity model
//!
//! Records product synchronization requests. Operations are created `pending`;
//! `running`, `completed` and `failed` are reserved for an executor.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Operation type recorded for product synchronization.
pub const OPERATION_PRODUCTS_SYNC: &str = "products_sync";

/// A recorded product synchronization request
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_operations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Store the operation belongs to
    pub store_id: String,

    /// Kind of operation (currently always `products_sync`)
    pub operation_type: String,

    /// Copy direction (currently always `erp_to_nuvemshop`)
    pub direction: String,

    /// Status (pending|running|completed|failed)
    pub status: String,

    pub started_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
