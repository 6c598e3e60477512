//! Order repository implementation
//!
//! Read queries and uncontended metadata updates. Creation, settlement and
//! cancellation mutate ticket rows too and therefore run inside the
//! reservation engine's transactions.

use sqlx::PgPool;
use chrono::Utc;
use crate::models::order::{Order, OrderItem, OrderWithItems};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find order by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Order>, TicketDeskError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at FROM orders WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Load an order together with its items
    pub async fn find_with_items(&self, id: i64) -> Result<Option<OrderWithItems>, TicketDeskError> {
        let Some(order) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let items = self.list_items(id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// List the price-snapshotted items of an order
    pub async fn list_items(&self, order_id: i64) -> Result<Vec<OrderItem>, TicketDeskError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, ticket_id, price_cents, created_at FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// List orders belonging to a buyer, newest first
    pub async fn list_for_user(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Order>, TicketDeskError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// List all orders, newest first (admin listings)
    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Order>, TicketDeskError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Update delivery contact fields, leaving status untouched
    pub async fn update_delivery(
        &self,
        id: i64,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Order, TicketDeskError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET delivery_name = COALESCE($2, delivery_name),
                delivery_email = COALESCE($3, delivery_email),
                delivery_phone = COALESCE($4, delivery_phone),
                updated_at = $5
            WHERE id = $1
            RETURNING id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }
}
