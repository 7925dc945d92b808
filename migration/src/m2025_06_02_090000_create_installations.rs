//! Migration to create the installations table.
//!
//! One row per store that completed the OAuth installation handshake. The
//! platform access token is stored encrypted; re-installs upsert on `store_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Installations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Installations::StoreId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Installations::AppId).text().not_null())
                    .col(
                        ColumnDef::new(Installations::AccessTokenCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Installations::Scope).text().null())
                    .col(ColumnDef::new(Installations::TokenType).text().null())
                    .col(
                        ColumnDef::new(Installations::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Installations::InstalledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Installations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Installations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Installations {
    Table,
    StoreId,
    AppId,
    AccessTokenCiphertext,
    Scope,
    TokenType,
    Status,
    InstalledAt,
    UpdatedAt,
}
