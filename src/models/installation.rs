//! Installation entity model
//!
//! One row per store that completed the installation handshake.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// A store's app installation with its encrypted platform access token
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "installations")]
pub struct Model {
    /// Platform store identifier (`user_id` in the token response)
    #[sea_orm(primary_key, auto_increment = false)]
    pub store_id: String,

    /// Client id of the app the store installed
    pub app_id: String,

    /// AES-256-GCM ciphertext of the access token (AAD `installation|<store_id>`)
    pub access_token_ciphertext: Vec<u8>,

    /// Granted scope as reported by the platform
    pub scope: Option<String>,

    /// Token type as reported by the platform
    pub token_type: Option<String>,

    /// Lifecycle status (active|revoked|expired)
    pub status: String,

    pub installed_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
