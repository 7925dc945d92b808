//! Installation repository
//!
//! Durable storage for [`InstallationRecord`]s keyed by `store_id`. Re-installs
//! upsert the existing row (last writer wins) and refresh `installed_at`.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Set};
use thiserror::Error;

use crate::crypto::{CryptoError, CryptoKey, TokenScope, decrypt_token, encrypt_token};
use crate::handshake::{InstallationRecord, InstallationStatus};
use crate::models::installation::{self, Column, Entity as Installation};

/// Failures while persisting an installation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encrypt access token: {0}")]
    Encryption(#[from] CryptoError),
    #[error("failed to write installation: {0}")]
    Database(#[from] DbErr),
}

/// Persistence seam for completed handshakes.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    /// Stores the record, replacing any previous installation of the same store.
    async fn save(&self, record: &InstallationRecord) -> Result<(), StoreError>;
}

/// SeaORM-backed installation storage with encrypted access tokens
#[derive(Debug, Clone)]
pub struct InstallationRepository {
    db: Arc<DatabaseConnection>,
    crypto_key: CryptoKey,
}

impl InstallationRepository {
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Loads the stored installation for a store, decrypting its access token.
    pub async fn find(&self, store_id: &str) -> Result<Option<InstallationRecord>> {
        let Some(model) = Installation::find_by_id(store_id.to_string())
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };

        let access_token = decrypt_token(
            &self.crypto_key,
            TokenScope::Installation,
            &model.store_id,
            &model.access_token_ciphertext,
        )
        .map_err(|e| {
            tracing::error!(store_id = %model.store_id, "Access token decryption failed");
            anyhow!("Access token decryption failed: {}", e)
        })?;

        let status = model
            .status
            .parse::<InstallationStatus>()
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Invalid status stored for store '{}'", model.store_id))?;

        Ok(Some(InstallationRecord {
            store_id: model.store_id,
            access_token,
            scope: model.scope,
            token_type: model.token_type,
            installed_at: model.installed_at.with_timezone(&Utc),
            status,
            state: None,
            app_id: model.app_id,
        }))
    }

    /// True when the store has an installation row. The token is not decrypted.
    pub async fn exists(&self, store_id: &str) -> Result<bool> {
        let count = Installation::find_by_id(store_id.to_string())
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl InstallationStore for InstallationRepository {
    async fn save(&self, record: &InstallationRecord) -> Result<(), StoreError> {
        let ciphertext = encrypt_token(
            &self.crypto_key,
            TokenScope::Installation,
            &record.store_id,
            &record.access_token,
        )?;
        let installed_at = record.installed_at.fixed_offset();

        let model = installation::ActiveModel {
            store_id: Set(record.store_id.clone()),
            app_id: Set(record.app_id.clone()),
            access_token_ciphertext: Set(ciphertext),
            scope: Set(record.scope.clone()),
            token_type: Set(record.token_type.clone()),
            status: Set(record.status.as_str().to_string()),
            installed_at: Set(installed_at),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        Installation::insert(model)
            .on_conflict(
                OnConflict::column(Column::StoreId)
                    .update_columns([
                        Column::AppId,
                        Column::AccessTokenCiphertext,
                        Column::Scope,
                        Column::TokenType,
                        Column::Status,
                        Column::InstalledAt,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        tracing::info!(
            store_id = %record.store_id,
            status = %record.status,
            "Installation stored"
        );

        Ok(())
    }
}
