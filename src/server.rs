//! # Server Configuration
//!
//! Router assembly, OpenAPI document and the serve loop for the Metricly API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers::{
    self, account, auth, billing, custom_metrics, events, integrations, metrics, notifications,
    reports, team, views,
};
use crate::scheduler::Scheduler;
use crate::services::{BillingGateway, NotificationHub, StripeClient};
use crate::telemetry::trace_id_middleware;
use crate::{db, seeds};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub billing: Arc<dyn BillingGateway>,
    pub notifications: NotificationHub,
}

impl AppState {
    /// State backed by the real Stripe API
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let billing: Arc<dyn BillingGateway> = Arc::new(StripeClient::new(&config.stripe));
        Self {
            config: Arc::new(config),
            db,
            billing,
            notifications: NotificationHub::default(),
        }
    }
}

/// Endpoints reachable without a bearer token
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/team/invites/accept", post(team::accept_invite))
        .route("/billing/webhook", post(billing::stripe_webhook))
        // Segment shares its name with `DELETE /integrations/{id}`; it carries the platform slug
        .route(
            "/integrations/{id}/callback",
            get(integrations::oauth_callback),
        )
        .route("/ws/notifications", get(notifications::notifications_ws))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/account",
            get(account::get_account).patch(account::update_account),
        )
        .route("/team/members", get(team::list_members))
        .route(
            "/team/members/{id}",
            patch(team::update_member).delete(team::remove_member),
        )
        .route(
            "/team/invites",
            get(team::list_invites).post(team::create_invite),
        )
        .route("/team/invites/{id}", delete(team::revoke_invite))
        .route("/billing/plans", get(billing::list_plans))
        .route("/billing/subscription", get(billing::get_subscription))
        .route("/billing/checkout", post(billing::create_checkout))
        .route("/billing/portal", post(billing::create_portal))
        .route("/integrations", get(integrations::list_integrations))
        .route(
            "/integrations/{id}/connect",
            post(integrations::connect_integration),
        )
        .route(
            "/integrations/{id}",
            delete(integrations::disconnect_integration),
        )
        .route("/ad-accounts", get(integrations::list_ad_accounts))
        .route("/ad-accounts/{id}", patch(integrations::update_ad_account))
        .route("/metrics/summary", get(metrics::summary))
        .route("/metrics/daily", get(metrics::daily))
        .route("/metrics/campaigns", get(metrics::campaigns))
        .route("/metrics/orders", get(metrics::orders))
        .route("/metrics/rebuild", post(metrics::rebuild))
        .route("/views", get(views::list_views).post(views::create_view))
        .route(
            "/views/{id}",
            patch(views::update_view).delete(views::delete_view),
        )
        .route(
            "/reports/scheduled",
            get(reports::list_scheduled_reports).post(reports::create_scheduled_report),
        )
        .route(
            "/reports/scheduled/{id}",
            patch(reports::update_scheduled_report).delete(reports::delete_scheduled_report),
        )
        .route(
            "/reports/custom",
            get(reports::list_custom_reports).post(reports::create_custom_report),
        )
        .route(
            "/reports/custom/{id}",
            get(reports::get_custom_report)
                .patch(reports::update_custom_report)
                .delete(reports::delete_custom_report),
        )
        .route("/reports/custom/{id}/run", post(reports::run_custom_report))
        .route("/reports/templates", get(reports::list_report_templates))
        .route(
            "/reports/templates/{id}/use",
            post(reports::use_report_template),
        )
        .route(
            "/custom-metrics",
            get(custom_metrics::list_custom_metrics).post(custom_metrics::create_custom_metric),
        )
        .route(
            "/custom-metrics/{id}",
            patch(custom_metrics::update_custom_metric)
                .delete(custom_metrics::delete_custom_metric),
        )
        .route(
            "/custom-metrics/{id}/value",
            get(custom_metrics::custom_metric_value),
        )
        .route("/events", get(events::list_events).post(events::track_event))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(config.frontend_url.trim_end_matches('/')) {
        Ok(origin) if !config.is_development() => layer.allow_origin(origin),
        _ => layer.allow_origin(Any),
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = public_routes().merge(protected_routes(&state));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let db = db::init_pool(&config).await?;
    if config.auto_migrate {
        db::run_migrations(&db).await?;
    }
    let seeded = seeds::seed_report_templates(&db)
        .await
        .context("Failed to seed report templates")?;
    tracing::info!(seeded, "Report templates ready");

    let addr = config
        .bind_addr()
        .context("Invalid server address")?;
    let state = AppState::new(config, db);

    let shutdown = CancellationToken::new();
    let scheduler_handle = if state.config.scheduler.enabled {
        let scheduler = Scheduler::new(
            state.config.clone(),
            state.db.clone(),
            state.notifications.clone(),
        );
        Some(tokio::spawn(scheduler.run(shutdown.child_token())))
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    let profile = state.config.profile.clone();
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "Failed to listen for shutdown signal");
            }
            tracing::info!("Graceful shutdown initiated");
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        match handle.await {
            Ok(Err(error)) => tracing::error!(error = ?error, "Scheduler exited with error"),
            Err(error) => tracing::error!(%error, "Scheduler task panicked"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::account::get_account,
        crate::handlers::account::update_account,
        crate::handlers::team::list_members,
        crate::handlers::team::update_member,
        crate::handlers::team::remove_member,
        crate::handlers::team::list_invites,
        crate::handlers::team::create_invite,
        crate::handlers::team::revoke_invite,
        crate::handlers::team::accept_invite,
        crate::handlers::billing::list_plans,
        crate::handlers::billing::get_subscription,
        crate::handlers::billing::create_checkout,
        crate::handlers::billing::create_portal,
        crate::handlers::billing::stripe_webhook,
        crate::handlers::integrations::list_integrations,
        crate::handlers::integrations::connect_integration,
        crate::handlers::integrations::oauth_callback,
        crate::handlers::integrations::disconnect_integration,
        crate::handlers::integrations::list_ad_accounts,
        crate::handlers::integrations::update_ad_account,
        crate::handlers::metrics::summary,
        crate::handlers::metrics::daily,
        crate::handlers::metrics::campaigns,
        crate::handlers::metrics::orders,
        crate::handlers::metrics::rebuild,
        crate::handlers::views::list_views,
        crate::handlers::views::create_view,
        crate::handlers::views::update_view,
        crate::handlers::views::delete_view,
        crate::handlers::reports::list_scheduled_reports,
        crate::handlers::reports::create_scheduled_report,
        crate::handlers::reports::update_scheduled_report,
        crate::handlers::reports::delete_scheduled_report,
        crate::handlers::reports::list_custom_reports,
        crate::handlers::reports::create_custom_report,
        crate::handlers::reports::get_custom_report,
        crate::handlers::reports::update_custom_report,
        crate::handlers::reports::delete_custom_report,
        crate::handlers::reports::run_custom_report,
        crate::handlers::reports::list_report_templates,
        crate::handlers::reports::use_report_template,
        crate::handlers::custom_metrics::list_custom_metrics,
        crate::handlers::custom_metrics::create_custom_metric,
        crate::handlers::custom_metrics::update_custom_metric,
        crate::handlers::custom_metrics::delete_custom_metric,
        crate::handlers::custom_metrics::custom_metric_value,
        crate::handlers::events::track_event,
        crate::handlers::events::list_events,
        crate::handlers::notifications::notifications_ws,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::auth::Role,
            crate::services::Notification,
            crate::services::billing::PlanLimits,
            crate::services::metrics::DateRange,
            crate::services::metrics::MetricsSummary,
            crate::services::metrics::MetricsChange,
            crate::services::metrics::SummaryComparison,
            crate::services::metrics::DailyPoint,
            crate::services::metrics::CampaignMetrics,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and the current session"),
        (name = "team", description = "Members and invitations"),
        (name = "billing", description = "Plans, subscriptions and Stripe"),
        (name = "integrations", description = "Platform connections and ad accounts"),
        (name = "metrics", description = "Dashboard metrics"),
        (name = "reports", description = "Scheduled, custom and template reports"),
    ),
    info(
        title = "Metricly API",
        description = "Multi-tenant e-commerce analytics API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
