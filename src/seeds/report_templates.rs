//! System report template seeding
//!
//! Inserts the built-in custom report blueprints shared by every account.

use anyhow::Result;
use sea_orm::ConnectionTrait;
use serde_json::{Value, json};

use crate::repositories::ReportTemplateRepository;
use crate::repositories::report_template::CreateTemplateRequest;

/// Configuration structure for a system template
struct TemplateSeed {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    config: Value,
}

fn system_templates() -> Vec<TemplateSeed> {
    vec![
        TemplateSeed {
            name: "Executive Overview",
            description: "Revenue, orders, ad spend and blended ROAS for the last 30 days",
            category: "overview",
            config: json!({
                "metrics": ["revenue", "orders", "aov", "ad_spend", "roas"],
                "dimensions": ["date"],
                "date_range": "last_30_days",
            }),
        },
        TemplateSeed {
            name: "Paid Media Performance",
            description: "Spend efficiency across ad platforms",
            category: "advertising",
            config: json!({
                "metrics": ["ad_spend", "impressions", "clicks", "ctr", "cpc", "roas"],
                "dimensions": ["platform", "campaign"],
                "date_range": "last_7_days",
            }),
        },
        TemplateSeed {
            name: "Customer Acquisition",
            description: "New customers against the spend that acquired them",
            category: "customers",
            config: json!({
                "metrics": ["new_customers", "ad_spend", "orders"],
                "dimensions": ["date"],
                "date_range": "month_to_date",
            }),
        },
        TemplateSeed {
            name: "Quarterly Revenue",
            description: "Revenue and order value trends over the last 90 days",
            category: "revenue",
            config: json!({
                "metrics": ["revenue", "orders", "aov"],
                "dimensions": ["date"],
                "date_range": "last_90_days",
            }),
        },
    ]
}

/// Seeds the system report templates, skipping any that already exist by name
pub async fn seed_report_templates<C: ConnectionTrait>(db: &C) -> Result<u64> {
    let repo = ReportTemplateRepository::new(db);
    let mut created = 0;

    for seed in system_templates() {
        if repo.find_system_by_name(seed.name).await?.is_some() {
            log::debug!("Report template '{}' already exists, skipping", seed.name);
            continue;
        }

        log::info!("Creating report template: {}", seed.name);
        repo.create(CreateTemplateRequest {
            account_id: None,
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            category: seed.category.to_string(),
            config: seed.config,
        })
        .await
        .map_err(|e| {
            log::error!("Failed to create report template '{}': {}", seed.name, e);
            e
        })?;
        created += 1;
    }

    log::info!("Report template seeding completed ({} created)", created);
    Ok(created)
}
