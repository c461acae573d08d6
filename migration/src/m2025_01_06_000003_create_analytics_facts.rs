//! Migration to create the ingested analytics fact tables.
//!
//! Creates `orders`, `order_items`, `ad_spend` and the `daily_metrics` rollup.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Orders::ExternalId).text().not_null())
                    .col(ColumnDef::new(Orders::OrderNumber).text().null())
                    .col(ColumnDef::new(Orders::CustomerEmail).text().null())
                    .col(
                        ColumnDef::new(Orders::TotalPrice)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::SubtotalPrice)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::TotalTax)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::TotalDiscounts)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::Currency)
                            .text()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Orders::FinancialStatus)
                            .text()
                            .not_null()
                            .default("paid"),
                    )
                    .col(ColumnDef::new(Orders::Source).text().null())
                    .col(ColumnDef::new(Orders::UtmCampaign).text().null())
                    .col(
                        ColumnDef::new(Orders::IsNewCustomer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Orders::OrderedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_account_id")
                            .from(Orders::Table, Orders::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_account_external")
                    .table(Orders::Table)
                    .col(Orders::AccountId)
                    .col(Orders::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Range scans for summaries and keyset pagination
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_account_ordered_at")
                    .table(Orders::Table)
                    .col(Orders::AccountId)
                    .col(Orders::OrderedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(OrderItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::AccountId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).text().null())
                    .col(ColumnDef::new(OrderItems::Sku).text().null())
                    .col(ColumnDef::new(OrderItems::Title).text().not_null())
                    .col(
                        ColumnDef::new(OrderItems::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(OrderItems::Price)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(OrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_account_id")
                            .from(OrderItems::Table, OrderItems::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdSpend::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdSpend::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AdSpend::AccountId).uuid().not_null())
                    .col(ColumnDef::new(AdSpend::AdAccountId).uuid().not_null())
                    .col(ColumnDef::new(AdSpend::Platform).text().not_null())
                    .col(ColumnDef::new(AdSpend::CampaignId).text().not_null())
                    .col(ColumnDef::new(AdSpend::CampaignName).text().not_null())
                    .col(ColumnDef::new(AdSpend::Date).date().not_null())
                    .col(
                        ColumnDef::new(AdSpend::Spend)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AdSpend::Impressions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AdSpend::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AdSpend::Conversions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AdSpend::ConversionValue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(AdSpend::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ad_spend_account_id")
                            .from(AdSpend::Table, AdSpend::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ad_spend_ad_account_id")
                            .from(AdSpend::Table, AdSpend::AdAccountId)
                            .to(AdAccounts::Table, AdAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ad_spend_ad_account_campaign_date")
                    .table(AdSpend::Table)
                    .col(AdSpend::AdAccountId)
                    .col(AdSpend::CampaignId)
                    .col(AdSpend::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ad_spend_account_date")
                    .table(AdSpend::Table)
                    .col(AdSpend::AccountId)
                    .col(AdSpend::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailyMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyMetrics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyMetrics::AccountId).uuid().not_null())
                    .col(ColumnDef::new(DailyMetrics::Date).date().not_null())
                    .col(
                        ColumnDef::new(DailyMetrics::Revenue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::OrdersCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::AdSpend)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::NewCustomers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::Impressions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyMetrics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_daily_metrics_account_id")
                            .from(DailyMetrics::Table, DailyMetrics::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_daily_metrics_account_date")
                    .table(DailyMetrics::Table)
                    .col(DailyMetrics::AccountId)
                    .col(DailyMetrics::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdSpend::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    AccountId,
    ExternalId,
    OrderNumber,
    CustomerEmail,
    TotalPrice,
    SubtotalPrice,
    TotalTax,
    TotalDiscounts,
    Currency,
    FinancialStatus,
    Source,
    UtmCampaign,
    IsNewCustomer,
    OrderedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    AccountId,
    ProductId,
    Sku,
    Title,
    Quantity,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdSpend {
    Table,
    Id,
    AccountId,
    AdAccountId,
    Platform,
    CampaignId,
    CampaignName,
    Date,
    Spend,
    Impressions,
    Clicks,
    Conversions,
    ConversionValue,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DailyMetrics {
    Table,
    Id,
    AccountId,
    Date,
    Revenue,
    OrdersCount,
    AdSpend,
    NewCustomers,
    Impressions,
    Clicks,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AdAccounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}
