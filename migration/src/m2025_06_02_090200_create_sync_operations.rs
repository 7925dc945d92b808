//! Migration to create the sync_operations table.
//!
//! Records product synchronization requests per store together with their
//! lifecycle timestamps, so the status view can report history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncOperations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncOperations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncOperations::StoreId).text().not_null())
                    .col(
                        ColumnDef::new(SyncOperations::OperationType)
                            .text()
                            .not_null()
                            .default("products_sync"),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::Direction)
                            .text()
                            .not_null()
                            .default("erp_to_nuvemshop"),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // History view lists a store's operations newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_operations_store_started")
                    .table(SyncOperations::Table)
                    .col(SyncOperations::StoreId)
                    .col(SyncOperations::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_operations_store_started")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncOperations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncOperations {
    Table,
    Id,
    StoreId,
    OperationType,
    Direction,
    Status,
    StartedAt,
    CompletedAt,
    CreatedAt,
}
