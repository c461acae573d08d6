//! Migration to create the integrations and ad_accounts tables.
//!
//! Integrations track per-platform connection state for an account; ad accounts
//! are the advertising accounts discovered through a connected integration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Integrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Integrations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Integrations::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Integrations::Platform).text().not_null())
                    .col(
                        ColumnDef::new(Integrations::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Integrations::ExternalAccountId)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Integrations::OauthState).text().null())
                    .col(ColumnDef::new(Integrations::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Integrations::ConnectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Integrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integrations_account_id")
                            .from(Integrations::Table, Integrations::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One integration per platform per account
        manager
            .create_index(
                Index::create()
                    .name("idx_integrations_account_platform")
                    .table(Integrations::Table)
                    .col(Integrations::AccountId)
                    .col(Integrations::Platform)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdAccounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AdAccounts::AccountId).uuid().not_null())
                    .col(ColumnDef::new(AdAccounts::IntegrationId).uuid().not_null())
                    .col(ColumnDef::new(AdAccounts::Platform).text().not_null())
                    .col(ColumnDef::new(AdAccounts::ExternalId).text().not_null())
                    .col(ColumnDef::new(AdAccounts::Name).text().not_null())
                    .col(
                        ColumnDef::new(AdAccounts::Currency)
                            .text()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ad_accounts_account_id")
                            .from(AdAccounts::Table, AdAccounts::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ad_accounts_integration_id")
                            .from(AdAccounts::Table, AdAccounts::IntegrationId)
                            .to(Integrations::Table, Integrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ad_accounts_account_platform_external")
                    .table(AdAccounts::Table)
                    .col(AdAccounts::AccountId)
                    .col(AdAccounts::Platform)
                    .col(AdAccounts::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdAccounts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Integrations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
    AccountId,
    Platform,
    Status,
    ExternalAccountId,
    OauthState,
    Metadata,
    ConnectedAt,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AdAccounts {
    Table,
    Id,
    AccountId,
    IntegrationId,
    Platform,
    ExternalId,
    Name,
    Currency,
    Status,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}
