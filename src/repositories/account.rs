//! # Account Repository
//!
//! Persistence for accounts, the tenant boundary of the service.

use crate::error::RepositoryError;
use crate::models::account::{self, ActiveModel, Entity as Account, Model as AccountModel};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

/// Changes accepted by [`AccountRepository::update_profile`]
#[derive(Debug, Clone, Default)]
pub struct AccountProfileUpdate {
    pub name: Option<String>,
    pub timezone: Option<String>,
    pub currency: Option<String>,
}

/// Repository for Account database operations
pub struct AccountRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Create a new account on the free plan
    pub async fn create(&self, name: &str) -> Result<AccountModel, RepositoryError> {
        let now = Utc::now();
        let account = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            plan: Set("free".to_string()),
            stripe_customer_id: Set(None),
            stripe_subscription_id: Set(None),
            timezone: Set("UTC".to_string()),
            currency: Set("USD".to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        account
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountModel>, RepositoryError> {
        Account::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Like [`Self::find_by_id`] but a missing account is an error
    pub async fn get(&self, id: Uuid) -> Result<AccountModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account"))
    }

    pub async fn find_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountModel>, RepositoryError> {
        Account::find()
            .filter(account::Column::StripeCustomerId.eq(customer_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        update: AccountProfileUpdate,
    ) -> Result<AccountModel, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(timezone) = update.timezone {
            active.timezone = Set(timezone);
        }
        if let Some(currency) = update.currency {
            active.currency = Set(currency);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn set_plan(&self, id: Uuid, plan: &str) -> Result<AccountModel, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();
        active.plan = Set(plan.to_string());
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Store Stripe identifiers; `None` leaves the existing value untouched
    pub async fn set_stripe_ids(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> Result<AccountModel, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();
        if let Some(customer_id) = customer_id {
            active.stripe_customer_id = Set(Some(customer_id.to_string()));
        }
        if let Some(subscription_id) = subscription_id {
            active.stripe_subscription_id = Set(Some(subscription_id.to_string()));
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
