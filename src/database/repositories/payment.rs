//! Payment ledger repository implementation
//!
//! Rows are keyed by the provider's charge-intent reference where one
//! exists, so duplicate notification deliveries update the same record
//! instead of appending a new one.

use sqlx::PgPool;
use chrono::Utc;
use crate::models::payment::{Payment, PaymentStatus};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct RecordPaymentRequest {
    pub order_id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub method: String,
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
    pub failure_reason: Option<String>,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a settlement attempt. When an external reference is present
    /// the row is upserted on it.
    pub async fn record(&self, request: RecordPaymentRequest) -> Result<Payment, TicketDeskError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (order_id, user_id, amount_cents, method, status, external_reference, failure_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (external_reference) DO UPDATE
            SET status = EXCLUDED.status,
                failure_reason = EXCLUDED.failure_reason,
                updated_at = EXCLUDED.updated_at
            RETURNING id, order_id, user_id, amount_cents, method, status, external_reference, failure_reason, created_at, updated_at
            "#
        )
        .bind(request.order_id)
        .bind(request.user_id)
        .bind(request.amount_cents)
        .bind(request.method)
        .bind(request.status)
        .bind(request.external_reference)
        .bind(request.failure_reason)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Mark the payment with this provider reference as failed. A row that
    /// already settled as completed is left untouched; out-of-order failure
    /// notifications must not rewrite it. Returns None when nothing was
    /// updated.
    pub async fn mark_failed_by_reference(
        &self,
        external_reference: &str,
        failure_reason: Option<String>,
    ) -> Result<Option<Payment>, TicketDeskError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'failed', failure_reason = $2, updated_at = $3
            WHERE external_reference = $1 AND status <> 'completed'
            RETURNING id, order_id, user_id, amount_cents, method, status, external_reference, failure_reason, created_at, updated_at
            "#
        )
        .bind(external_reference)
        .bind(failure_reason)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Find a payment by the provider's charge-intent reference
    pub async fn find_by_reference(&self, external_reference: &str) -> Result<Option<Payment>, TicketDeskError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT id, order_id, user_id, amount_cents, method, status, external_reference, failure_reason, created_at, updated_at FROM payments WHERE external_reference = $1"
        )
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// List all settlement attempts recorded against an order
    pub async fn list_for_order(&self, order_id: i64) -> Result<Vec<Payment>, TicketDeskError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, order_id, user_id, amount_cents, method, status, external_reference, failure_reason, created_at, updated_at FROM payments WHERE order_id = $1 ORDER BY id ASC"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
