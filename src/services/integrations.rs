//! # Platform Integrations
//!
//! OAuth connection lifecycle for commerce and ad platforms plus the ad
//! accounts discovered through them. Token exchange is not performed; a
//! successful callback only records the connection.

use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet, RedirectUrl, Scope,
    TokenUrl, basic::BasicClient,
};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::config::{AppConfig, OAuthClientConfig};
use crate::crypto::generate_token;
use crate::error::{ApiError, bad_request};
use crate::models::ad_account::Model as AdAccountModel;
use crate::models::integration::Model as IntegrationModel;
use crate::repositories::{AccountRepository, AdAccountRepository, IntegrationRepository};
use crate::server::AppState;
use crate::services::billing::{Resource, check_limit};
use crate::services::events;

type AuthorizeClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Static OAuth endpoints of a supported platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub slug: &'static str,
    pub display_name: &'static str,
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub scopes: &'static [&'static str],
}

pub const PLATFORMS: [PlatformDescriptor; 4] = [
    PlatformDescriptor {
        slug: "shopify",
        display_name: "Shopify",
        auth_url: "https://admin.shopify.com/oauth/authorize",
        token_url: "https://admin.shopify.com/oauth/access_token",
        scopes: &["read_orders", "read_customers", "read_products"],
    },
    PlatformDescriptor {
        slug: "meta_ads",
        display_name: "Meta Ads",
        auth_url: "https://www.facebook.com/v19.0/dialog/oauth",
        token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
        scopes: &["ads_read", "business_management"],
    },
    PlatformDescriptor {
        slug: "google_ads",
        display_name: "Google Ads",
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        scopes: &["https://www.googleapis.com/auth/adwords"],
    },
    PlatformDescriptor {
        slug: "tiktok_ads",
        display_name: "TikTok Ads",
        auth_url: "https://business-api.tiktok.com/portal/auth",
        token_url: "https://business-api.tiktok.com/open_api/v1.3/oauth2/access_token/",
        scopes: &["ad.read"],
    },
];

pub fn find_platform(slug: &str) -> Result<&'static PlatformDescriptor, ApiError> {
    PLATFORMS
        .iter()
        .find(|platform| platform.slug == slug)
        .ok_or_else(|| {
            bad_request("platform must be one of shopify, meta_ads, google_ads, tiktok_ads")
        })
}

/// Ad account statuses a user may set directly
pub const SETTABLE_AD_ACCOUNT_STATUSES: [&str; 2] = ["active", "paused"];

/// Result of starting an OAuth connection
#[derive(Debug, Clone)]
pub struct ConnectStart {
    pub integration: IntegrationModel,
    /// `None` when no OAuth client is configured for the platform
    pub authorize_url: Option<String>,
}

fn redirect_uri(config: &AppConfig, platform: &PlatformDescriptor) -> String {
    format!(
        "{}/integrations/{}/callback",
        config.frontend_url.trim_end_matches('/'),
        platform.slug
    )
}

/// Build the provider authorization URL carrying `state`
pub fn build_authorize_url(
    config: &AppConfig,
    platform: &PlatformDescriptor,
    credentials: &OAuthClientConfig,
    state: &str,
) -> Result<String, ApiError> {
    let (Some(client_id), Some(client_secret)) = (
        credentials.client_id.clone(),
        credentials.client_secret.clone(),
    ) else {
        return Err(anyhow::anyhow!("incomplete OAuth credentials for {}", platform.slug).into());
    };

    let auth_url = AuthUrl::new(platform.auth_url.to_string())
        .map_err(|e| anyhow::anyhow!("invalid auth url for {}: {e}", platform.slug))?;
    let token_url = TokenUrl::new(platform.token_url.to_string())
        .map_err(|e| anyhow::anyhow!("invalid token url for {}: {e}", platform.slug))?;
    let redirect_url = RedirectUrl::new(redirect_uri(config, platform))
        .map_err(|e| anyhow::anyhow!("invalid redirect url for {}: {e}", platform.slug))?;

    let client: AuthorizeClient = BasicClient::new(ClientId::new(client_id))
        .set_client_secret(ClientSecret::new(client_secret))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url);

    let state = state.to_string();
    let (url, _csrf) = client
        .authorize_url(|| CsrfToken::new(state))
        .add_scopes(platform.scopes.iter().map(|s| Scope::new(s.to_string())))
        .url();

    Ok(url.to_string())
}

pub struct IntegrationService<'a> {
    state: &'a AppState,
}

impl<'a> IntegrationService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn list(&self, auth: &AuthUser) -> Result<Vec<IntegrationModel>, ApiError> {
        auth.require(Permission::ViewMetrics)?;
        Ok(IntegrationRepository::new(&self.state.db)
            .list_by_account(auth.account_id)
            .await?)
    }

    /// Put the platform integration into `pending` and issue an OAuth state
    pub async fn connect(&self, auth: &AuthUser, platform: &str) -> Result<ConnectStart, ApiError> {
        auth.require(Permission::ManageIntegrations)?;
        let platform = find_platform(platform)?;

        let db = &self.state.db;
        let integrations = IntegrationRepository::new(db);
        let existing = integrations
            .find_by_platform(auth.account_id, platform.slug)
            .await?;
        let already_counted = existing
            .as_ref()
            .is_some_and(|integration| integration.status != "disconnected");

        if !already_counted {
            let account = AccountRepository::new(db).get(auth.account_id).await?;
            let in_use = integrations.count_in_use(account.id).await?;
            check_limit(&account.plan, Resource::Integrations, in_use)?;
        }

        let state = generate_token();
        let integration = integrations
            .upsert_pending(auth.account_id, platform.slug, &state)
            .await?;

        let authorize_url = match self.state.config.oauth_client(platform.slug) {
            Some(credentials) => Some(build_authorize_url(
                &self.state.config,
                platform,
                credentials,
                &state,
            )?),
            None => {
                tracing::warn!(
                    platform = platform.slug,
                    "No OAuth client configured; returning pending integration without authorize URL"
                );
                None
            }
        };

        tracing::info!(
            account_id = %auth.account_id,
            integration_id = %integration.id,
            platform = platform.slug,
            "Integration connection started"
        );

        Ok(ConnectStart {
            integration,
            authorize_url,
        })
    }

    /// Complete the OAuth flow for the pending integration that issued `state`
    pub async fn callback(
        &self,
        platform: &str,
        code: &str,
        state: &str,
    ) -> Result<IntegrationModel, ApiError> {
        let platform = find_platform(platform)?;
        if code.trim().is_empty() {
            return Err(bad_request("code is required"));
        }
        if state.trim().is_empty() {
            return Err(bad_request("state is required"));
        }

        let db = &self.state.db;
        let integrations = IntegrationRepository::new(db);
        let pending = integrations
            .find_pending_by_state(platform.slug, state)
            .await?
            .ok_or_else(|| {
                tracing::warn!(platform = platform.slug, "OAuth callback with unknown state");
                bad_request("invalid or expired OAuth state")
            })?;

        let integration = integrations
            .mark_connected(
                pending,
                json!({ "platform": platform.display_name, "authorization_received": true }),
            )
            .await?;

        tracing::info!(
            account_id = %integration.account_id,
            integration_id = %integration.id,
            platform = platform.slug,
            "Integration connected"
        );
        metrics::counter!("integrations_connected_total", "platform" => platform.slug)
            .increment(1);

        events::track(
            db,
            Some(integration.account_id),
            None,
            "integration.connected",
            json!({ "platform": platform.slug }),
        )
        .await;
        self.state.notifications.publish(
            integration.account_id,
            "integration.connected",
            json!({ "integration_id": integration.id, "platform": platform.slug }),
        );

        Ok(integration)
    }

    pub async fn disconnect(&self, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        auth.require(Permission::ManageIntegrations)?;

        let db = &self.state.db;
        let integrations = IntegrationRepository::new(db);
        let integration = integrations.get_in_account(auth.account_id, id).await?;
        let platform = integration.platform.clone();

        let integration = integrations.mark_disconnected(integration).await?;
        let ad_accounts = AdAccountRepository::new(db)
            .disconnect_for_integration(integration.id)
            .await?;

        tracing::info!(
            account_id = %auth.account_id,
            integration_id = %integration.id,
            %platform,
            ad_accounts,
            "Integration disconnected"
        );
        self.state.notifications.publish(
            auth.account_id,
            "integration.disconnected",
            json!({ "integration_id": integration.id, "platform": platform }),
        );
        Ok(())
    }

    pub async fn ad_accounts(
        &self,
        auth: &AuthUser,
        platform: Option<&str>,
    ) -> Result<Vec<AdAccountModel>, ApiError> {
        auth.require(Permission::ViewMetrics)?;
        if let Some(platform) = platform {
            find_platform(platform)?;
        }
        Ok(AdAccountRepository::new(&self.state.db)
            .list_by_account(auth.account_id, platform)
            .await?)
    }

    pub async fn set_ad_account_status(
        &self,
        auth: &AuthUser,
        id: Uuid,
        status: &str,
    ) -> Result<AdAccountModel, ApiError> {
        auth.require(Permission::ManageIntegrations)?;
        if !SETTABLE_AD_ACCOUNT_STATUSES.contains(&status) {
            return Err(bad_request("status must be one of active, paused"));
        }

        let ad_accounts = AdAccountRepository::new(&self.state.db);
        let ad_account = ad_accounts.get_in_account(auth.account_id, id).await?;
        if ad_account.status == "disconnected" {
            return Err(bad_request(
                "ad account is disconnected; reconnect the integration first",
            ));
        }

        Ok(ad_accounts.update_status(ad_account, status).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret-456".to_string()),
        }
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(find_platform("shopify").is_ok());
        let err = find_platform("myspace").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn authorize_url_carries_client_state_and_scopes() {
        let config = AppConfig {
            frontend_url: "https://app.metricly.test/".to_string(),
            ..AppConfig::default()
        };
        let platform = find_platform("google_ads").unwrap();

        let url = build_authorize_url(&config, platform, &credentials(), "state-abc").unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-123"));
        assert_eq!(pairs.get("state").map(String::as_str), Some("state-abc"));
        assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(
            pairs.get("redirect_uri").map(String::as_str),
            Some("https://app.metricly.test/integrations/google_ads/callback")
        );
        assert!(pairs["scope"].contains("adwords"));
    }

    #[test]
    fn incomplete_credentials_fail() {
        let platform = find_platform("meta_ads").unwrap();
        let credentials = OAuthClientConfig {
            client_id: Some("only-id".to_string()),
            client_secret: None,
        };
        assert!(build_authorize_url(&AppConfig::default(), platform, &credentials, "s").is_err());
    }
}
