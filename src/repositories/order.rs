//! # Order Repository
//!
//! Read-side queries over ingested orders: revenue aggregates for a time
//! window and keyset-paginated listings.

use crate::cursor::OrderCursor;
use crate::error::RepositoryError;
use crate::models::order::{self, Entity as Order, Model as OrderModel, NON_REVENUE_STATUSES};
use crate::models::order_item::{self, Entity as OrderItem, Model as OrderItemModel};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
    sea_query::{Condition, Expr, Func, SimpleExpr},
};
use std::collections::HashMap;
use uuid::Uuid;

/// Revenue-side totals for a time window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RevenueTotals {
    pub revenue: f64,
    pub orders: u64,
    pub new_customers: u64,
}

#[derive(Debug, FromQueryResult)]
struct RevenueSum {
    revenue: Option<f64>,
}

/// Repository for Order database operations
pub struct OrderRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Revenue-bearing orders of an account with `start <= ordered_at < end`
    fn revenue_orders(account_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Select<Order> {
        Order::find()
            .filter(order::Column::AccountId.eq(account_id))
            .filter(order::Column::OrderedAt.gte(start))
            .filter(order::Column::OrderedAt.lt(end))
            .filter(order::Column::FinancialStatus.is_not_in(NON_REVENUE_STATUSES))
    }

    pub async fn revenue_totals(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RevenueTotals, RepositoryError> {
        let sum = Self::revenue_orders(account_id, start, end)
            .select_only()
            .column_as(
                SimpleExpr::from(Func::sum(Expr::col(order::Column::TotalPrice))),
                "revenue",
            )
            .into_model::<RevenueSum>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let orders = Self::revenue_orders(account_id, start, end)
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let new_customers = Self::revenue_orders(account_id, start, end)
            .filter(order::Column::IsNewCustomer.eq(true))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(RevenueTotals {
            revenue: sum.and_then(|s| s.revenue).unwrap_or(0.0),
            orders,
            new_customers,
        })
    }

    /// Revenue-bearing orders in the window, oldest first, for daily rollups
    pub async fn list_revenue_orders(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OrderModel>, RepositoryError> {
        Self::revenue_orders(account_id, start, end)
            .order_by_asc(order::Column::OrderedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// One page of orders, newest first, continuing after `cursor`.
    ///
    /// Fetches `limit + 1` rows so the caller can tell whether another page
    /// exists.
    pub async fn page(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u64,
        cursor: Option<OrderCursor>,
    ) -> Result<Vec<OrderModel>, RepositoryError> {
        let mut query = Order::find()
            .filter(order::Column::AccountId.eq(account_id))
            .filter(order::Column::OrderedAt.gte(start))
            .filter(order::Column::OrderedAt.lt(end));

        if let Some(cursor) = cursor {
            let ordered_at: sea_orm::prelude::DateTimeWithTimeZone = cursor.ordered_at.into();
            query = query.filter(
                Condition::any()
                    .add(order::Column::OrderedAt.lt(ordered_at))
                    .add(
                        Condition::all()
                            .add(order::Column::OrderedAt.eq(ordered_at))
                            .add(order::Column::Id.lt(cursor.id)),
                    ),
            );
        }

        query
            .order_by_desc(order::Column::OrderedAt)
            .order_by_desc(order::Column::Id)
            .limit(limit + 1)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Line items for the given orders, grouped by order id
    pub async fn items_for_orders(
        &self,
        account_id: Uuid,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItemModel>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let items = OrderItem::find()
            .filter(order_item::Column::AccountId.eq(account_id))
            .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }
}
