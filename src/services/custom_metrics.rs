//! User-defined metrics computed from formulas over the base metrics.

use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::error::{ApiError, bad_request, conflict};
use crate::models::custom_metric::Model as CustomMetricModel;
use crate::repositories::custom_metric::{CreateCustomMetricRequest, CustomMetricUpdate};
use crate::repositories::{AccountRepository, CustomMetricRepository};
use crate::services::billing::{Resource, check_limit};
use crate::services::formula::{self, Expr, is_base_metric};
use crate::services::metrics::{DateRange, MetricsService};
use crate::services::validation::{slugify, validate_name};
use sea_orm::DatabaseConnection;

pub const METRIC_FORMATS: [&str; 3] = ["number", "currency", "percent"];
pub const MAX_METRIC_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct NewCustomMetric {
    pub name: String,
    pub formula: String,
    pub format: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomMetricChanges {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
}

/// Value of a custom metric over a range
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMetricValue {
    pub metric: CustomMetricModel,
    pub range: DateRange,
    pub value: f64,
}

fn parse_formula(raw: &str) -> Result<(String, Expr), ApiError> {
    let trimmed = raw.trim();
    formula::parse(trimmed)
        .map(|expr| (trimmed.to_string(), expr))
        .map_err(|e| bad_request(&format!("invalid formula: {e}")))
}

fn metric_key(name: &str) -> Result<String, ApiError> {
    let key = slugify(name);
    if key.is_empty() {
        return Err(bad_request("name must contain at least one letter or digit"));
    }
    if is_base_metric(&key) {
        return Err(bad_request(&format!(
            "'{key}' is a built-in metric; choose another name"
        )));
    }
    Ok(key)
}

fn validate_format(format: &str) -> Result<(), ApiError> {
    if METRIC_FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(bad_request("format must be one of number, currency, percent"))
    }
}

pub async fn list(
    db: &DatabaseConnection,
    auth: &AuthUser,
) -> Result<Vec<CustomMetricModel>, ApiError> {
    auth.require(Permission::ViewMetrics)?;
    Ok(CustomMetricRepository::new(db)
        .list_by_account(auth.account_id)
        .await?)
}

pub async fn create(
    db: &DatabaseConnection,
    auth: &AuthUser,
    input: NewCustomMetric,
) -> Result<CustomMetricModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let name = validate_name(&input.name, "name", MAX_METRIC_NAME_LEN)?;
    let key = metric_key(&name)?;
    let (formula, _) = parse_formula(&input.formula)?;
    let format = input.format.unwrap_or_else(|| "number".to_string());
    validate_format(&format)?;

    let metrics = CustomMetricRepository::new(db);
    let account = AccountRepository::new(db).get(auth.account_id).await?;
    check_limit(
        &account.plan,
        Resource::CustomMetrics,
        metrics.count_by_account(account.id).await?,
    )?;

    if metrics.find_by_key(account.id, &key).await?.is_some() {
        return Err(conflict("A custom metric with this name already exists"));
    }

    let metric = metrics
        .create(CreateCustomMetricRequest {
            account_id: account.id,
            name,
            key,
            formula,
            format,
            description: input.description,
        })
        .await?;
    tracing::info!(account_id = %account.id, key = %metric.key, "Custom metric created");
    Ok(metric)
}

pub async fn update(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
    changes: CustomMetricChanges,
) -> Result<CustomMetricModel, ApiError> {
    auth.require(Permission::EditReports)?;

    let metrics = CustomMetricRepository::new(db);
    let metric = metrics.get_in_account(auth.account_id, id).await?;

    // The key stays fixed on rename; saved reports reference it
    let name = changes
        .name
        .map(|name| validate_name(&name, "name", MAX_METRIC_NAME_LEN))
        .transpose()?;
    let formula = changes
        .formula
        .map(|raw| parse_formula(&raw).map(|(formula, _)| formula))
        .transpose()?;
    if let Some(format) = &changes.format {
        validate_format(format)?;
    }

    Ok(metrics
        .update(
            metric,
            CustomMetricUpdate {
                name,
                formula,
                format: changes.format,
                description: changes.description,
            },
        )
        .await?)
}

pub async fn delete(db: &DatabaseConnection, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    auth.require(Permission::EditReports)?;
    let metrics = CustomMetricRepository::new(db);
    let metric = metrics.get_in_account(auth.account_id, id).await?;
    metrics.delete(metric).await?;
    Ok(())
}

pub async fn evaluate(
    db: &DatabaseConnection,
    auth: &AuthUser,
    id: Uuid,
    range: DateRange,
) -> Result<CustomMetricValue, ApiError> {
    auth.require(Permission::ViewMetrics)?;

    let metric = CustomMetricRepository::new(db)
        .get_in_account(auth.account_id, id)
        .await?;
    let (_, expr) = parse_formula(&metric.formula)?;
    let summary = MetricsService::new(db)
        .summary_for(auth.account_id, range)
        .await?;

    tracing::debug!(
        metric = %metric.key,
        start = %range.start,
        end = %range.end,
        "Evaluated custom metric"
    );
    Ok(CustomMetricValue {
        value: expr.evaluate(&summary.as_values()),
        metric,
        range,
    })
}
