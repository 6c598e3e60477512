//! Subscription repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::subscription::{Subscription, UpsertSubscriptionRequest};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update the local row for a provider subscription. Keyed by
    /// the provider subscription id so repeated notifications converge.
    pub async fn upsert(&self, request: UpsertSubscriptionRequest) -> Result<Subscription, TicketDeskError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (user_id, provider_customer_id, provider_subscription_id, status, current_period_end, cancel_at_period_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (provider_subscription_id) DO UPDATE
            SET status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, provider_customer_id, provider_subscription_id, status, current_period_end, cancel_at_period_end, created_at, updated_at
            "#
        )
        .bind(request.user_id)
        .bind(request.provider_customer_id)
        .bind(request.provider_subscription_id)
        .bind(request.status)
        .bind(request.current_period_end)
        .bind(request.cancel_at_period_end)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Find a subscription by the provider's subscription id
    pub async fn find_by_provider_id(&self, provider_subscription_id: &str) -> Result<Option<Subscription>, TicketDeskError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT id, user_id, provider_customer_id, provider_subscription_id, status, current_period_end, cancel_at_period_end, created_at, updated_at FROM subscriptions WHERE provider_subscription_id = $1"
        )
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Find a user's subscription
    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<Subscription>, TicketDeskError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT id, user_id, provider_customer_id, provider_subscription_id, status, current_period_end, cancel_at_period_end, created_at, updated_at FROM subscriptions WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }
}
