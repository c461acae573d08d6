//! # Subscription Repository
//!
//! Local mirror of Stripe subscriptions, keyed by the Stripe subscription id.

use crate::error::RepositoryError;
use crate::models::subscription::{
    self, ActiveModel, Entity as Subscription, Model as SubscriptionModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Subscription state received from Stripe
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub account_id: Uuid,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub plan: String,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Repository for Subscription database operations
pub struct SubscriptionRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SubscriptionRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionModel>, RepositoryError> {
        Subscription::find()
            .filter(subscription::Column::StripeSubscriptionId.eq(stripe_subscription_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Most recently updated subscription of an account
    pub async fn latest_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SubscriptionModel>, RepositoryError> {
        Subscription::find()
            .filter(subscription::Column::AccountId.eq(account_id))
            .order_by_desc(subscription::Column::UpdatedAt)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn upsert(
        &self,
        data: SubscriptionUpsert,
    ) -> Result<SubscriptionModel, RepositoryError> {
        let now = Utc::now();

        match self.find_by_stripe_id(&data.stripe_subscription_id).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.account_id = Set(data.account_id);
                active.stripe_customer_id = Set(data.stripe_customer_id);
                active.plan = Set(data.plan);
                active.status = Set(data.status);
                active.current_period_start = Set(data.current_period_start.map(Into::into));
                active.current_period_end = Set(data.current_period_end.map(Into::into));
                active.cancel_at_period_end = Set(data.cancel_at_period_end);
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => {
                let row = ActiveModel {
                    id: Set(Uuid::new_v4()),
                    account_id: Set(data.account_id),
                    stripe_subscription_id: Set(data.stripe_subscription_id),
                    stripe_customer_id: Set(data.stripe_customer_id),
                    plan: Set(data.plan),
                    status: Set(data.status),
                    current_period_start: Set(data.current_period_start.map(Into::into)),
                    current_period_end: Set(data.current_period_end.map(Into::into)),
                    cancel_at_period_end: Set(data.cancel_at_period_end),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                row.insert(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
        }
    }

    pub async fn set_status(
        &self,
        subscription: SubscriptionModel,
        status: &str,
    ) -> Result<SubscriptionModel, RepositoryError> {
        let mut active = subscription.into_active_model();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
