//! Migration to create the reporting tables.
//!
//! Creates `saved_views`, `scheduled_reports`, `custom_reports`,
//! `report_templates` and `custom_metrics`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SavedViews::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SavedViews::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SavedViews::AccountId).uuid().not_null())
                    .col(ColumnDef::new(SavedViews::UserId).uuid().not_null())
                    .col(ColumnDef::new(SavedViews::Name).text().not_null())
                    .col(ColumnDef::new(SavedViews::Page).text().not_null())
                    .col(ColumnDef::new(SavedViews::Filters).json_binary().not_null())
                    .col(
                        ColumnDef::new(SavedViews::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SavedViews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SavedViews::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_views_account_id")
                            .from(SavedViews::Table, SavedViews::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_views_user_id")
                            .from(SavedViews::Table, SavedViews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_saved_views_account_user")
                    .table(SavedViews::Table)
                    .col(SavedViews::AccountId)
                    .col(SavedViews::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduledReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduledReports::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScheduledReports::AccountId).uuid().not_null())
                    .col(ColumnDef::new(ScheduledReports::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(ScheduledReports::Name).text().not_null())
                    .col(ColumnDef::new(ScheduledReports::ReportType).text().not_null())
                    .col(ColumnDef::new(ScheduledReports::Frequency).text().not_null())
                    .col(
                        ColumnDef::new(ScheduledReports::Recipients)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledReports::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ScheduledReports::LastSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledReports::NextRunAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScheduledReports::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_reports_account_id")
                            .from(ScheduledReports::Table, ScheduledReports::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scheduled_reports_due")
                    .table(ScheduledReports::Table)
                    .col(ScheduledReports::IsActive)
                    .col(ScheduledReports::NextRunAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomReports::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomReports::AccountId).uuid().not_null())
                    .col(ColumnDef::new(CustomReports::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(CustomReports::Name).text().not_null())
                    .col(ColumnDef::new(CustomReports::Description).text().null())
                    .col(ColumnDef::new(CustomReports::Metrics).json_binary().not_null())
                    .col(
                        ColumnDef::new(CustomReports::Dimensions)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomReports::Filters).json_binary().not_null())
                    .col(
                        ColumnDef::new(CustomReports::DateRange)
                            .text()
                            .not_null()
                            .default("last_30_days"),
                    )
                    .col(
                        ColumnDef::new(CustomReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CustomReports::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_reports_account_id")
                            .from(CustomReports::Table, CustomReports::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReportTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReportTemplates::AccountId).uuid().null())
                    .col(ColumnDef::new(ReportTemplates::Name).text().not_null())
                    .col(ColumnDef::new(ReportTemplates::Description).text().null())
                    .col(ColumnDef::new(ReportTemplates::Category).text().not_null())
                    .col(ColumnDef::new(ReportTemplates::Config).json_binary().not_null())
                    .col(
                        ColumnDef::new(ReportTemplates::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReportTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_templates_account_id")
                            .from(ReportTemplates::Table, ReportTemplates::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomMetrics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomMetrics::AccountId).uuid().not_null())
                    .col(ColumnDef::new(CustomMetrics::Name).text().not_null())
                    .col(ColumnDef::new(CustomMetrics::Key).text().not_null())
                    .col(ColumnDef::new(CustomMetrics::Formula).text().not_null())
                    .col(
                        ColumnDef::new(CustomMetrics::Format)
                            .text()
                            .not_null()
                            .default("number"),
                    )
                    .col(ColumnDef::new(CustomMetrics::Description).text().null())
                    .col(
                        ColumnDef::new(CustomMetrics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CustomMetrics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_metrics_account_id")
                            .from(CustomMetrics::Table, CustomMetrics::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_custom_metrics_account_key")
                    .table(CustomMetrics::Table)
                    .col(CustomMetrics::AccountId)
                    .col(CustomMetrics::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReportTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomReports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScheduledReports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SavedViews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SavedViews {
    Table,
    Id,
    AccountId,
    UserId,
    Name,
    Page,
    Filters,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ScheduledReports {
    Table,
    Id,
    AccountId,
    CreatedBy,
    Name,
    ReportType,
    Frequency,
    Recipients,
    IsActive,
    LastSentAt,
    NextRunAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CustomReports {
    Table,
    Id,
    AccountId,
    CreatedBy,
    Name,
    Description,
    Metrics,
    Dimensions,
    Filters,
    DateRange,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReportTemplates {
    Table,
    Id,
    AccountId,
    Name,
    Description,
    Category,
    Config,
    IsSystem,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CustomMetrics {
    Table,
    Id,
    AccountId,
    Name,
    Key,
    Formula,
    Format,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
