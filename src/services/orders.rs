//! Reservation engine
//!
//! Creates orders, places and lifts holds on tickets, and enforces the
//! ticket/order state machines. Every validate-and-mutate sequence runs in a
//! single transaction with the affected ticket/order rows locked, so two
//! concurrent purchases of the same ticket cannot both succeed: the loser
//! observes a non-available status and fails cleanly.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::repositories::OrderRepository;
use crate::models::event::EventStatus;
use crate::models::order::{
    CreateOrderRequest, Order, OrderItem, OrderStatus, OrderWithItems, UpdateOrderRequest,
};
use crate::models::payment::PaymentStatus;
use crate::models::ticket::TicketStatus;
use crate::models::user::Actor;
use crate::services::cache::CacheInvalidator;
use crate::utils::errors::{Result, TicketDeskError};

/// Maximum tickets per order
pub const MAX_TICKETS_PER_ORDER: usize = 5;

/// Ticket row joined with its event, as loaded under a row lock
#[derive(Debug, sqlx::FromRow)]
struct LockedTicket {
    id: i64,
    event_id: i64,
    price_cents: i64,
    status: TicketStatus,
    event_status: EventStatus,
    starts_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    orders: OrderRepository,
    cache: CacheInvalidator,
    hold_duration: Duration,
}

impl OrderService {
    pub fn new(pool: PgPool, cache: CacheInvalidator, hold_minutes: i64) -> Self {
        Self {
            orders: OrderRepository::new(pool.clone()),
            pool,
            cache,
            hold_duration: Duration::minutes(hold_minutes),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Atomically validate and hold the requested tickets, creating a
    /// pending order with price-snapshotted items.
    pub async fn create_order(
        &self,
        actor: Actor,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems> {
        let ticket_ids = request.ticket_ids;
        debug!(user_id = actor.user_id, ticket_ids = ?ticket_ids, "Creating order");

        if ticket_ids.is_empty() {
            return Err(TicketDeskError::InvalidInput(
                "at least one ticket id is required".to_string(),
            ));
        }
        if ticket_ids.len() > MAX_TICKETS_PER_ORDER {
            return Err(TicketDeskError::InvalidInput(format!(
                "at most {MAX_TICKETS_PER_ORDER} tickets per order"
            )));
        }
        let mut deduped = ticket_ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        if deduped.len() != ticket_ids.len() {
            return Err(TicketDeskError::InvalidInput(
                "duplicate ticket ids in request".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // Lock the ticket rows in id order; concurrent overlapping requests
        // then serialize instead of deadlocking.
        let tickets = sqlx::query_as::<_, LockedTicket>(
            r#"
            SELECT t.id, t.event_id, t.price_cents, t.status,
                   e.status AS event_status, e.starts_at
            FROM tickets t
            JOIN events e ON e.id = t.event_id
            WHERE t.id = ANY($1)
            ORDER BY t.id
            FOR UPDATE OF t
            "#,
        )
        .bind(&ticket_ids)
        .fetch_all(&mut *tx)
        .await?;

        if tickets.len() != ticket_ids.len() {
            return Err(TicketDeskError::TicketsNotFound {
                requested: ticket_ids.len(),
                found: tickets.len(),
            });
        }
        if let Some(t) = tickets
            .iter()
            .find(|t| !t.status.can_transition_to(TicketStatus::Reserved))
        {
            return Err(TicketDeskError::TicketUnavailable { ticket_id: t.id });
        }
        if let Some(t) = tickets.iter().find(|t| t.event_status != EventStatus::Published) {
            return Err(TicketDeskError::EventNotPublished { event_id: t.event_id });
        }
        let now = Utc::now();
        if let Some(t) = tickets.iter().find(|t| t.starts_at <= now) {
            return Err(TicketDeskError::EventAlreadyOccurred { event_id: t.event_id });
        }
        let event_id = tickets[0].event_id;
        if tickets.iter().any(|t| t.event_id != event_id) {
            return Err(TicketDeskError::InvalidInput(
                "all tickets must belong to a single event".to_string(),
            ));
        }

        let total_cents: i64 = tickets.iter().map(|t| t.price_cents).sum();
        let reserved_until = now + self.hold_duration;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $8)
            RETURNING id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id)
        .bind(event_id)
        .bind(total_cents)
        .bind(request.contact.name)
        .bind(request.contact.email)
        .bind(request.contact.phone)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(tickets.len());
        for ticket in &tickets {
            let item = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_id, ticket_id, price_cents, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, ticket_id, price_cents, created_at
                "#,
            )
            .bind(order.id)
            .bind(ticket.id)
            .bind(ticket.price_cents)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'reserved', reserved_until = $2, order_id = $3, updated_at = $4
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ticket_ids)
        .bind(reserved_until)
        .bind(order.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = order.id,
            user_id = actor.user_id,
            event_id = event_id,
            total_cents = total_cents,
            tickets = ticket_ids.len(),
            "Order created, tickets held"
        );

        // Post-commit, fire and forget
        self.cache.invalidate_event(event_id).await;

        Ok(OrderWithItems { order, items })
    }

    /// Direct settlement path: append a completed payment, confirm the order
    /// and mark its tickets sold. Used for non-card/manual methods and as
    /// the final step after a charge intent succeeded client-side.
    pub async fn pay_order(
        &self,
        order_id: i64,
        actor: Actor,
        method: &str,
        external_reference: Option<String>,
    ) -> Result<OrderWithItems> {
        self.settle(order_id, Some(actor), method, external_reference, true)
            .await
    }

    /// Settlement entry for the reconciler: ownership was already
    /// established by the verified provider notification.
    pub(crate) async fn settle_order(
        &self,
        order_id: i64,
        method: &str,
        external_reference: Option<String>,
    ) -> Result<OrderWithItems> {
        self.settle(order_id, None, method, external_reference, true).await
    }

    /// Legacy/explicit confirmation: confirm the order and sell its tickets
    /// without writing a payment row.
    pub async fn confirm_order(&self, order_id: i64) -> Result<OrderWithItems> {
        self.settle(order_id, None, "", None, false).await
    }

    async fn settle(
        &self,
        order_id: i64,
        actor: Option<Actor>,
        method: &str,
        external_reference: Option<String>,
        record_payment: bool,
    ) -> Result<OrderWithItems> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            "SELECT id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TicketDeskError::OrderNotFound { order_id })?;

        if let Some(actor) = actor {
            if !actor.is_admin() && order.user_id != actor.user_id {
                return Err(TicketDeskError::Forbidden(
                    "order belongs to another buyer".to_string(),
                ));
            }
        }
        if !order.status.can_transition_to(OrderStatus::Confirmed) {
            if record_payment {
                return Err(TicketDeskError::OrderNotPending {
                    order_id,
                    status: order.status,
                });
            }
            return Err(TicketDeskError::InvalidTransition {
                from: order.status.to_string(),
                to: OrderStatus::Confirmed.to_string(),
            });
        }

        let now = Utc::now();

        if record_payment {
            sqlx::query(
                r#"
                INSERT INTO payments (order_id, user_id, amount_cents, method, status, external_reference, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                ON CONFLICT (external_reference) DO UPDATE
                SET status = EXCLUDED.status, failure_reason = NULL, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(order.id)
            .bind(order.user_id)
            .bind(order.total_cents)
            .bind(method)
            .bind(PaymentStatus::Completed)
            .bind(external_reference)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = 'confirmed', updated_at = $2
            WHERE id = $1
            RETURNING id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // Settlement clears the deadline, which also removes these tickets
        // from the sweeper's selection set.
        sqlx::query(
            "UPDATE tickets SET status = 'sold', reserved_until = NULL, updated_at = $2 WHERE order_id = $1",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = order_id,
            user_id = order.user_id,
            method = method,
            "Order settled, tickets sold"
        );

        self.cache.invalidate_event(order.event_id).await;

        let items = self.orders.list_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Cancel an order and release its tickets back to inventory.
    /// Non-admins may cancel only their own pending orders.
    pub async fn cancel_order(&self, order_id: i64, actor: Actor) -> Result<OrderWithItems> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            "SELECT id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TicketDeskError::OrderNotFound { order_id })?;

        if !actor.is_admin() {
            if order.user_id != actor.user_id {
                return Err(TicketDeskError::Forbidden(
                    "order belongs to another buyer".to_string(),
                ));
            }
            if !order.status.can_transition_to(OrderStatus::Cancelled) {
                return Err(TicketDeskError::InvalidTransition {
                    from: order.status.to_string(),
                    to: OrderStatus::Cancelled.to_string(),
                });
            }
        } else if order.status == OrderStatus::Cancelled {
            return Err(TicketDeskError::InvalidTransition {
                from: order.status.to_string(),
                to: OrderStatus::Cancelled.to_string(),
            });
        }

        let now = Utc::now();

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = 'cancelled', updated_at = $2
            WHERE id = $1
            RETURNING id, reference, user_id, event_id, status, total_cents, delivery_name, delivery_email, delivery_phone, created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'available', reserved_until = NULL, order_id = NULL, updated_at = $2
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = order_id,
            actor_id = actor.user_id,
            "Order cancelled, tickets released"
        );

        self.cache.invalidate_event(order.event_id).await;

        let items = self.orders.list_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Update an order. A status change may only request cancellation and is
    /// routed through the cancellation path; delivery metadata is editable
    /// by the owner while pending and by admins at any status.
    pub async fn update_order(
        &self,
        order_id: i64,
        actor: Actor,
        request: UpdateOrderRequest,
    ) -> Result<OrderWithItems> {
        if let Some(status) = request.status {
            if status == OrderStatus::Cancelled {
                return self.cancel_order(order_id, actor).await;
            }
            let order = self
                .orders
                .find_by_id(order_id)
                .await?
                .ok_or(TicketDeskError::OrderNotFound { order_id })?;
            return Err(TicketDeskError::InvalidTransition {
                from: order.status.to_string(),
                to: status.to_string(),
            });
        }

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketDeskError::OrderNotFound { order_id })?;

        if !actor.is_admin() {
            if order.user_id != actor.user_id {
                return Err(TicketDeskError::Forbidden(
                    "order belongs to another buyer".to_string(),
                ));
            }
            if order.status != OrderStatus::Pending {
                return Err(TicketDeskError::InvalidTransition {
                    from: order.status.to_string(),
                    to: order.status.to_string(),
                });
            }
        }

        let order = self
            .orders
            .update_delivery(
                order_id,
                request.delivery_name,
                request.delivery_email,
                request.delivery_phone,
            )
            .await?;

        debug!(order_id = order_id, actor_id = actor.user_id, "Order delivery metadata updated");

        let items = self.orders.list_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// List orders: admins see everything, buyers only their own
    pub async fn get_orders(&self, actor: Actor, limit: i64, offset: i64) -> Result<Vec<Order>> {
        if limit > 100 {
            return Err(TicketDeskError::InvalidInput(
                "limit cannot exceed 100".to_string(),
            ));
        }

        if actor.is_admin() {
            self.orders.list_all(limit, offset).await
        } else {
            self.orders.list_for_user(actor.user_id, limit, offset).await
        }
    }

    /// Fetch one order with its items, enforcing ownership
    pub async fn get_order(&self, order_id: i64, actor: Actor) -> Result<OrderWithItems> {
        let order = self
            .orders
            .find_with_items(order_id)
            .await?
            .ok_or(TicketDeskError::OrderNotFound { order_id })?;

        if !actor.is_admin() && order.order.user_id != actor.user_id {
            warn!(
                order_id = order_id,
                actor_id = actor.user_id,
                "Rejected cross-buyer order read"
            );
            return Err(TicketDeskError::Forbidden(
                "order belongs to another buyer".to_string(),
            ));
        }

        Ok(order)
    }
}
