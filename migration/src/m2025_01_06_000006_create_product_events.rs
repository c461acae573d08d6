//! Migration to create the product_events audit/analytics log.
//!
//! Rows are append-only. `account_id` and `user_id` are nullable so that
//! events survive account deletion and pre-signup events can be recorded.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductEvents::AccountId).uuid().null())
                    .col(ColumnDef::new(ProductEvents::UserId).uuid().null())
                    .col(ColumnDef::new(ProductEvents::EventName).text().not_null())
                    .col(
                        ColumnDef::new(ProductEvents::Properties)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_events_account_created")
                    .table(ProductEvents::Table)
                    .col(ProductEvents::AccountId)
                    .col(ProductEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductEvents {
    Table,
    Id,
    AccountId,
    UserId,
    EventName,
    Properties,
    CreatedAt,
}
