//! # Reports
//!
//! Scheduled email reports, ad-hoc custom reports over base and custom
//! metrics, and the templates custom reports can be created from.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::error::{ApiError, bad_request};
use crate::models::custom_report::Model as CustomReportModel;
use crate::models::report_template::Model as ReportTemplateModel;
use crate::models::scheduled_report::Model as ScheduledReportModel;
use crate::repositories::custom_report::{CreateCustomReportRequest, CustomReportUpdate};
use crate::repositories::scheduled_report::{
    CreateScheduledReportRequest, ScheduledReportUpdate,
};
use crate::repositories::{
    AccountRepository, CustomMetricRepository, CustomReportRepository, ReportTemplateRepository,
    ScheduledReportRepository,
};
use crate::services::billing::{Resource, check_limit};
use crate::services::formula::{self, is_base_metric};
use crate::services::metrics::{DateRange, MetricsService, REPORT_DATE_RANGES};
use crate::services::validation::{normalize_email, validate_name};
use sea_orm::DatabaseConnection;

pub const REPORT_TYPES: [&str; 3] = ["summary", "campaigns", "orders"];
pub const REPORT_FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];
pub const REPORT_DIMENSIONS: [&str; 3] = ["date", "platform", "campaign"];
pub const MAX_RECIPIENTS: usize = 20;
pub const MAX_REPORT_NAME_LEN: usize = 255;

/// Next run after `from` for a schedule frequency
pub fn next_run_at(frequency: &str, from: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
    match frequency {
        "daily" => Ok(from + Duration::days(1)),
        "weekly" => Ok(from + Duration::days(7)),
        "monthly" => from
            .checked_add_months(Months::new(1))
            .ok_or_else(|| bad_request("schedule date out of range")),
        _ => Err(bad_request("frequency must be one of daily, weekly, monthly")),
    }
}

fn validate_frequency(frequency: &str) -> Result<(), ApiError> {
    if REPORT_FREQUENCIES.contains(&frequency) {
        Ok(())
    } else {
        Err(bad_request("frequency must be one of daily, weekly, monthly"))
    }
}

fn validate_report_type(report_type: &str) -> Result<(), ApiError> {
    if REPORT_TYPES.contains(&report_type) {
        Ok(())
    } else {
        Err(bad_request("report_type must be one of summary, campaigns, orders"))
    }
}

/// Normalize and de-duplicate recipients, keeping first-seen order
pub fn validate_recipients(recipients: &[String]) -> Result<Vec<String>, ApiError> {
    if recipients.is_empty() {
        return Err(bad_request("recipients must contain at least one email"));
    }
    if recipients.len() > MAX_RECIPIENTS {
        return Err(bad_request("recipients cannot contain more than 20 emails"));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(recipients.len());
    for raw in recipients {
        let email = normalize_email(raw)
            .map_err(|_| bad_request(&format!("'{}' is not a valid email address", raw.trim())))?;
        if !normalized.contains(&email) {
            normalized.push(email);
        }
    }
    Ok(normalized)
}

fn validate_date_range(keyword: &str) -> Result<(), ApiError> {
    if REPORT_DATE_RANGES.contains(&keyword) {
        Ok(())
    } else {
        Err(bad_request(
            "date_range must be one of last_7_days, last_30_days, last_90_days, month_to_date, year_to_date",
        ))
    }
}

fn validate_dimensions(dimensions: &[String]) -> Result<(), ApiError> {
    match dimensions
        .iter()
        .find(|dimension| !REPORT_DIMENSIONS.contains(&dimension.as_str()))
    {
        Some(unknown) => Err(bad_request(&format!(
            "unknown dimension '{unknown}'; expected one of date, platform, campaign"
        ))),
        None => Ok(()),
    }
}

fn validate_filters(filters: &Value) -> Result<(), ApiError> {
    if filters.is_object() {
        Ok(())
    } else {
        Err(bad_request("filters must be a JSON object"))
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn validate_metrics(
    db: &DatabaseConnection,
    account_id: Uuid,
    metrics: &[String],
) -> Result<(), ApiError> {
    if metrics.is_empty() {
        return Err(bad_request("metrics must contain at least one metric"));
    }

    let repository = CustomMetricRepository::new(db);
    for metric in metrics {
        if is_base_metric(metric) {
            continue;
        }
        if repository.find_by_key(account_id, metric).await?.is_none() {
            return Err(bad_request(&format!("unknown metric '{metric}'")));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewScheduledReport {
    pub name: String,
    pub report_type: String,
    pub frequency: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduledReportChanges {
    pub name: Option<String>,
    pub report_type: Option<String>,
    pub frequency: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

pub async fn list_scheduled(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<Vec<ScheduledReportModel>, ApiError> {
    auth.require(Permission::ViewMetrics)?;
    Ok(ScheduledReportRepository::new(db)
        .list_by_account(auth.account_id)
        .await?)
}

pub async fn create_scheduled(
    db: &DatabaseConnection,
    auth: &AuthUser,
    input: NewScheduledReport,
) -> Result<ScheduledReportModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let name = validate_name(&input.name, "name", MAX_REPORT_NAME_LEN)?;
    validate_report_type(&input.report_type)?;
    let next_run_at = next_run_at(&input.frequency, Utc::now())?;
    let recipients = validate_recipients(&input.recipients)?;

    let reports = ScheduledReportRepository::new(db);
    let account = AccountRepository::new(db).get(auth.account_id).await?;
    check_limit(
        &account.plan,
        Resource::ScheduledReports,
        reports.count_by_account(account.id).await?,
    )?;

    let report = reports
        .create(CreateScheduledReportRequest {
            account_id: account.id,
            created_by: auth.user_id,
            name,
            report_type: input.report_type,
            frequency: input.frequency,
            recipients,
            next_run_at,
        })
        .await?;
    tracing::info!(
        account_id = %account.id,
        report_id = %report.id,
        frequency = %report.frequency,
        "Scheduled report created"
    );
    Ok(report)
}

pub async fn update_scheduled(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
    changes: ScheduledReportChanges,
) -> Result<ScheduledReportModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let name = changes
        .name
        .map(|name| validate_name(&name, "name", MAX_REPORT_NAME_LEN))
        .transpose()?;
    if let Some(report_type) = &changes.report_type {
        validate_report_type(report_type)?;
    }
    if let Some(frequency) = &changes.frequency {
        validate_frequency(frequency)?;
    }
    let recipients = changes
        .recipients
        .map(|recipients| validate_recipients(&recipients))
        .transpose()?;

    let reports = ScheduledReportRepository::new(db);
    let report = reports.get_in_account(auth.account_id, id).await?;

    // A new frequency or a reactivation restarts the schedule from now
    let reactivated = changes.is_active == Some(true) && !report.is_active;
    let frequency_changed = changes
        .frequency
        .as_ref()
        .is_some_and(|frequency| *frequency != report.frequency);
    let next = if frequency_changed || reactivated {
        let frequency = changes.frequency.as_deref().unwrap_or(&report.frequency);
        Some(next_run_at(frequency, Utc::now())?)
    } else {
        None
    };

    Ok(reports
        .update(
            report,
            ScheduledReportUpdate {
                name,
                report_type: changes.report_type,
                frequency: changes.frequency,
                recipients,
                is_active: changes.is_active,
                next_run_at: next,
            },
        )
        .await?)
}

pub async fn delete_scheduled(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
) -> Result<(), ApiError> {
    auth.require(Permission::EditReports)?;
    let reports = ScheduledReportRepository::new(db);
    let report = reports.get_in_account(auth.account_id, id).await?;
    reports.delete(report).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewCustomReport {
    pub name: String,
    pub description: Option<String>,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Option<Value>,
    pub date_range: String,
}

#[derive(Debug, Clone, Default)]
pub struct CustomReportChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub dimensions: Option<Vec<String>>,
    pub filters: Option<Value>,
    pub date_range: Option<String>,
}

/// Values of a custom report over its resolved range
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRun {
    pub report: CustomReportModel,
    pub range: DateRange,
    pub values: BTreeMap<String, f64>,
}

pub async fn list_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<Vec<CustomReportModel>, ApiError> {
    auth.require(Permission::ViewMetrics)?;
    Ok(CustomReportRepository::new(db)
        .list_by_account(auth.account_id)
        .await?)
}

pub async fn get_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
) -> Result<CustomReportModel, ApiError> {
    auth.require(Permission::ViewMetrics)?;
    Ok(CustomReportRepository::new(db)
        .get_in_account(auth.account_id, id)
        .await?)
}

pub async fn create_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
    input: NewCustomReport,
) -> Result<CustomReportModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let name = validate_name(&input.name, "name", MAX_REPORT_NAME_LEN)?;
    validate_date_range(&input.date_range)?;
    validate_dimensions(&input.dimensions)?;
    let filters = input.filters.unwrap_or_else(|| json!({}));
    validate_filters(&filters)?;
    validate_metrics(db, auth.account_id, &input.metrics).await?;

    let reports = CustomReportRepository::new(db);
    let account = AccountRepository::new(db).get(auth.account_id).await?;
    check_limit(
        &account.plan,
        Resource::CustomReports,
        reports.count_by_account(account.id).await?,
    )?;

    let report = reports
        .create(CreateCustomReportRequest {
            account_id: account.id,
            created_by: auth.user_id,
            name,
            description: input.description,
            metrics: input.metrics,
            dimensions: input.dimensions,
            filters,
            date_range: input.date_range,
        })
        .await?;
    tracing::info!(account_id = %account.id, report_id = %report.id, "Custom report created");
    Ok(report)
}

pub async fn update_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
    changes: CustomReportChanges,
) -> Result<CustomReportModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let name = changes
        .name
        .map(|name| validate_name(&name, "name", MAX_REPORT_NAME_LEN))
        .transpose()?;
    if let Some(date_range) = &changes.date_range {
        validate_date_range(date_range)?;
    }
    if let Some(dimensions) = &changes.dimensions {
        validate_dimensions(dimensions)?;
    }
    if let Some(filters) = &changes.filters {
        validate_filters(filters)?;
    }
    if let Some(metrics) = &changes.metrics {
        validate_metrics(db, auth.account_id, metrics).await?;
    }

    let reports = CustomReportRepository::new(db);
    let report = reports.get_in_account(auth.account_id, id).await?;
    Ok(reports
        .update(
            report,
            CustomReportUpdate {
                name,
                description: changes.description,
                metrics: changes.metrics,
                dimensions: changes.dimensions,
                filters: changes.filters,
                date_range: changes.date_range,
            },
        )
        .await?)
}

pub async fn delete_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
) -> Result<(), ApiError> {
    auth.require(Permission::EditReports)?;
    let reports = CustomReportRepository::new(db);
    let report = reports.get_in_account(auth.account_id, id).await?;
    reports.delete(report).await?;
    Ok(())
}

/// Evaluate every metric of a custom report over its relative range.
///
/// Custom metrics deleted after the report was saved evaluate to 0.
pub async fn run_custom(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
) -> Result<ReportRun, ApiError> {
    auth.require(Permission::ViewMetrics)?;

    let report = CustomReportRepository::new(db)
        .get_in_account(auth.account_id, id)
        .await?;
    let range = DateRange::from_keyword(&report.date_range, Utc::now().date_naive())?;
    let summary = MetricsService::new(db)
        .summary_for(auth.account_id, range)
        .await?;
    let base_values = summary.as_values();

    let custom: HashMap<String, String> = CustomMetricRepository::new(db)
        .list_by_account(auth.account_id)
        .await?
        .into_iter()
        .map(|metric| (metric.key, metric.formula))
        .collect();

    let mut values = BTreeMap::new();
    for metric in string_list(&report.metrics) {
        let value = match base_values.get(metric.as_str()) {
            Some(value) => *value,
            None => match custom.get(&metric) {
                Some(formula) => formula::parse(formula)
                    .map(|expr| expr.evaluate(&base_values))
                    .unwrap_or_else(|e| {
                        tracing::warn!(metric = %metric, error = %e, "Stored formula no longer parses");
                        0.0
                    }),
                None => 0.0,
            },
        };
        values.insert(metric, value);
    }

    Ok(ReportRun {
        report,
        range,
        values,
    })
}

/// Blueprint stored in a template's `config`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default = "default_template_range")]
    pub date_range: String,
}

fn default_template_range() -> String {
    "last_30_days".to_string()
}

pub async fn list_templates(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<Vec<ReportTemplateModel>, ApiError> {
    auth.require(Permission::ViewMetrics)?;
    Ok(ReportTemplateRepository::new(db)
        .list_visible(auth.account_id)
        .await?)
}

/// Create a custom report from a template's blueprint
pub async fn use_template(
    db: &DatabaseConnection,
    auth: &AuthUser,
    template_id: Uuid,
    name: Option<String>,
) -> Result<CustomReportModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let template = ReportTemplateRepository::new(db)
        .get_visible(auth.account_id, template_id)
        .await?;
    let config: TemplateConfig = serde_json::from_value(template.config.clone()).map_err(|e| {
        anyhow::anyhow!("report template {} has an invalid config: {e}", template.id)
    })?;

    create_custom(
        db,
        auth,
        NewCustomReport {
            name: name.unwrap_or_else(|| template.name.clone()),
            description: template.description.clone(),
            metrics: config.metrics,
            dimensions: config.dimensions,
            filters: config.filters,
            date_range: config.date_range,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_run_follows_frequency() {
        let from = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();

        assert_eq!(
            next_run_at("daily", from).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            next_run_at("weekly", from).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 7, 9, 0, 0).unwrap()
        );
        // Clamped to the last day of a shorter month
        assert_eq!(
            next_run_at("monthly", from).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
        assert!(next_run_at("hourly", from).is_err());
    }

    #[test]
    fn recipients_are_normalized_and_bounded() {
        let recipients = validate_recipients(&[
            " Ops@Example.com ".to_string(),
            "ops@example.com".to_string(),
            "cfo@example.com".to_string(),
        ])
        .unwrap();
        assert_eq!(recipients, vec!["ops@example.com", "cfo@example.com"]);

        assert!(validate_recipients(&[]).is_err());
        assert!(validate_recipients(&["not-an-email".to_string()]).is_err());

        let too_many: Vec<String> = (0..21).map(|i| format!("user{i}@example.com")).collect();
        assert!(validate_recipients(&too_many).is_err());
    }

    #[test]
    fn dimensions_and_ranges_are_checked() {
        assert!(validate_dimensions(&["date".to_string(), "platform".to_string()]).is_ok());
        assert!(validate_dimensions(&["country".to_string()]).is_err());
        assert!(validate_date_range("month_to_date").is_ok());
        assert!(validate_date_range("last_year").is_err());
    }

    #[test]
    fn template_config_defaults() {
        let config: TemplateConfig =
            serde_json::from_value(json!({ "metrics": ["revenue", "roas"] })).unwrap();
        assert_eq!(config.metrics, vec!["revenue", "roas"]);
        assert!(config.dimensions.is_empty());
        assert_eq!(config.date_range, "last_30_days");
    }
}
