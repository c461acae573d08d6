//! # Background Scheduler
//!
//! Periodic task that refreshes connected integrations whose last sync is
//! older than the configured interval and advances scheduled reports that
//! have come due. Platform data pulls are not performed here; a sync only
//! stamps the integration and its active ad accounts.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge, histogram};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::integration::Model as IntegrationModel;
use crate::models::scheduled_report::Model as ScheduledReportModel;
use crate::repositories::{AdAccountRepository, IntegrationRepository, ScheduledReportRepository};
use crate::services::NotificationHub;
use crate::services::reports::next_run_at;

/// Background scheduler service.
pub struct Scheduler {
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    notifications: NotificationHub,
}

/// Work done by one tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickStats {
    pub integrations_synced: u64,
    pub ad_accounts_stamped: u64,
    pub reports_sent: u64,
    pub errors: u64,
}

impl Scheduler {
    pub fn new(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        notifications: NotificationHub,
    ) -> Self {
        Self {
            config,
            db,
            notifications,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ApiError> {
        info!(
            tick_interval_seconds = self.config.scheduler.tick_interval_seconds,
            sync_interval_seconds = self.config.scheduler.sync_interval_seconds,
            "Starting scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.scheduler.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    if let Err(err) = self.tick(Utc::now()).await {
                        error!(error = ?err, "Scheduler tick failed");
                    }
                    histogram!("scheduler_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Process everything due at `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickStats, ApiError> {
        let mut stats = TickStats::default();

        let cutoff = now - Duration::seconds(self.config.scheduler.sync_interval_seconds as i64);
        let due_integrations = IntegrationRepository::new(&self.db)
            .list_due_for_sync(cutoff)
            .await?;
        gauge!("scheduler_integrations_due").set(due_integrations.len() as f64);

        for integration in due_integrations {
            let integration_id = integration.id;
            match self.sync_integration(integration, now).await {
                Ok(stamped) => {
                    stats.integrations_synced += 1;
                    stats.ad_accounts_stamped += stamped;
                }
                Err(err) => {
                    stats.errors += 1;
                    error!(error = ?err, %integration_id, "Failed to sync integration");
                }
            }
        }

        let due_reports = ScheduledReportRepository::new(&self.db)
            .list_due(now)
            .await?;
        for report in due_reports {
            let report_id = report.id;
            match self.send_report(report, now).await {
                Ok(()) => stats.reports_sent += 1,
                Err(err) => {
                    stats.errors += 1;
                    error!(error = ?err, %report_id, "Failed to advance scheduled report");
                }
            }
        }

        counter!("scheduler_integrations_synced_total").increment(stats.integrations_synced);
        counter!("scheduler_reports_sent_total").increment(stats.reports_sent);
        debug!(
            integrations = stats.integrations_synced,
            ad_accounts = stats.ad_accounts_stamped,
            reports = stats.reports_sent,
            errors = stats.errors,
            "Scheduler tick completed"
        );

        Ok(stats)
    }

    async fn sync_integration(
        &self,
        integration: IntegrationModel,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let stamped = AdAccountRepository::new(&self.db)
            .stamp_synced_for_integration(integration.id, now)
            .await?;
        let integration = IntegrationRepository::new(&self.db)
            .stamp_synced(integration, now)
            .await?;

        debug!(
            integration_id = %integration.id,
            platform = %integration.platform,
            ad_accounts = stamped,
            "Integration synced"
        );
        self.notifications.publish(
            integration.account_id,
            "integration.synced",
            json!({ "integration_id": integration.id, "platform": integration.platform }),
        );
        Ok(stamped)
    }

    async fn send_report(
        &self,
        report: ScheduledReportModel,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        // Catch up from now rather than replaying missed runs
        let next = match next_run_at(&report.frequency, now) {
            Ok(next) => next,
            Err(_) => {
                warn!(report_id = %report.id, frequency = %report.frequency, "Unknown report frequency; retrying in a day");
                now + Duration::days(1)
            }
        };

        let report = ScheduledReportRepository::new(&self.db)
            .mark_sent(report, now, next)
            .await?;

        info!(
            report_id = %report.id,
            account_id = %report.account_id,
            next_run_at = %next,
            "Scheduled report sent"
        );
        self.notifications.publish(
            report.account_id,
            "report.sent",
            json!({ "report_id": report.id, "name": report.name, "next_run_at": next }),
        );
        Ok(())
    }
}
