//! ERP configuration entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Per-store ERP connection settings
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "erp_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub store_id: String,

    /// Base URL of the store's ERP API
    pub erp_url: String,

    /// AES-256-GCM ciphertext of the ERP API token (AAD `erp_config|<store_id>`)
    pub erp_token_ciphertext: Vec<u8>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
