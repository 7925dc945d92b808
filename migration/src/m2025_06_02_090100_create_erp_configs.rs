//! Migration to create the erp_configs table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ErpConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErpConfigs::StoreId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ErpConfigs::ErpUrl).text().not_null())
                    .col(
                        ColumnDef::new(ErpConfigs::ErpTokenCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ErpConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ErpConfigs::UpdatedAt)
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
            .drop_table(Table::drop().table(ErpConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ErpConfigs {
    Table,
    StoreId,
    ErpUrl,
    ErpTokenCiphertext,
    CreatedAt,
    UpdatedAt,
}
