//! ERP configuration repository

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use secrecy::SecretString;

use crate::crypto::{CryptoKey, TokenScope, decrypt_token, encrypt_token};
use crate::models::erp_config::{self, Column, Entity as ErpConfig};

/// Repository for per-store ERP settings; the ERP token is stored encrypted
#[derive(Debug, Clone)]
pub struct ErpConfigRepository {
    db: Arc<DatabaseConnection>,
    crypto_key: CryptoKey,
}

impl ErpConfigRepository {
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    pub async fn find(&self, store_id: &str) -> Result<Option<erp_config::Model>> {
        Ok(ErpConfig::find_by_id(store_id.to_string())
            .one(&*self.db)
            .await?)
    }

    /// Creates or replaces the store's ERP settings. `created_at` survives updates.
    pub async fn upsert(
        &self,
        store_id: &str,
        erp_url: &str,
        erp_token: &SecretString,
    ) -> Result<erp_config::Model> {
        let ciphertext = encrypt_token(&self.crypto_key, TokenScope::ErpConfig, store_id, erp_token)
            .map_err(|e| anyhow!("ERP token encryption failed: {}", e))?;
        let now = Utc::now().fixed_offset();

        let model = erp_config::ActiveModel {
            store_id: Set(store_id.to_string()),
            erp_url: Set(erp_url.to_string()),
            erp_token_ciphertext: Set(ciphertext),
            created_at: Set(now),
            updated_at: Set(now),
        };

        ErpConfig::insert(model)
            .on_conflict(
                OnConflict::column(Column::StoreId)
                    .update_columns([
                        Column::ErpUrl,
                        Column::ErpTokenCiphertext,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        self.find(store_id)
            .await?
            .ok_or_else(|| anyhow!("ERP config for store '{}' missing after upsert", store_id))
    }

    /// Decrypts the stored ERP token, if the store has a configuration.
    pub async fn erp_token(&self, store_id: &str) -> Result<Option<SecretString>> {
        let Some(model) = self.find(store_id).await? else {
            return Ok(None);
        };

        let token = decrypt_token(
            &self.crypto_key,
            TokenScope::ErpConfig,
            &model.store_id,
            &model.erp_token_ciphertext,
        )
        .map_err(|e| {
            tracing::error!(store_id = %model.store_id, "ERP token decryption failed");
            anyhow!("ERP token decryption failed: {}", e)
        })?;

        Ok(Some(token))
    }
}
