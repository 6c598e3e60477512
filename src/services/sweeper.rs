//! Expiration sweeper
//!
//! Holds are pure data (a stored deadline), so expiry survives process
//! restarts and the sweeper is just a stateless poll: release every ticket
//! whose deadline passed and cancel the pending orders that owned them. A
//! settlement that wins the race clears the deadline first, which removes
//! its tickets from the selection set and makes the sweep safe to run
//! concurrently with every other engine operation.

use sqlx::PgPool;
use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::user::Actor;
use crate::services::cache::CacheInvalidator;
use crate::utils::errors::{Result, TicketDeskError};

/// Counts reported by one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub released_tickets: u64,
    pub cancelled_orders: u64,
}

#[derive(Debug, sqlx::FromRow)]
struct ReleasedTicket {
    order_id: i64,
    event_id: i64,
}

#[derive(Clone)]
pub struct SweeperService {
    pool: PgPool,
    cache: CacheInvalidator,
    interval: Duration,
}

impl SweeperService {
    pub fn new(pool: PgPool, cache: CacheInvalidator, interval_minutes: u64) -> Self {
        Self {
            pool,
            cache,
            interval: Duration::from_secs(interval_minutes * 60),
        }
    }

    /// One sweep pass. Unexpected errors are logged and reported as a zero
    /// outcome so the periodic loop keeps its schedule; storage-connectivity
    /// faults propagate so the caller can alert.
    pub async fn run_once(&self) -> Result<SweepOutcome> {
        match self.sweep().await {
            Ok(outcome) => {
                if outcome.released_tickets > 0 {
                    info!(
                        released_tickets = outcome.released_tickets,
                        cancelled_orders = outcome.cancelled_orders,
                        "Expired reservations released"
                    );
                } else {
                    debug!("Sweep found no expired reservations");
                }
                Ok(outcome)
            }
            Err(e) if e.is_storage_unavailable() => Err(e),
            Err(e) => {
                warn!(error = %e, "Sweep iteration failed, returning zero outcome");
                Ok(SweepOutcome::default())
            }
        }
    }

    /// Admin-triggered manual sweep
    pub async fn release_expired_reservations(&self, actor: Actor) -> Result<SweepOutcome> {
        if !actor.is_admin() {
            return Err(TicketDeskError::Forbidden(
                "manual sweep requires admin role".to_string(),
            ));
        }
        crate::utils::logging::log_admin_action(actor.user_id, "release_expired_reservations", None);
        self.run_once().await
    }

    /// Spawn the periodic sweep task: one immediate run, then a fixed
    /// interval.
    pub fn spawn(&self) -> JoinHandle<()> {
        let sweeper = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = sweeper.run_once().await {
                    error!(error = %e, "Sweep skipped: storage unavailable");
                }
            }
        })
    }

    async fn sweep(&self) -> Result<SweepOutcome> {
        let mut tx = self.pool.begin().await?;

        // The row locks taken by this UPDATE serialize the sweep against
        // concurrent settlement/cancellation of the same tickets.
        let released = sqlx::query_as::<_, ReleasedTicket>(
            r#"
            WITH expired AS (
                SELECT id, order_id, event_id
                FROM tickets
                WHERE status = 'reserved' AND reserved_until < NOW()
                FOR UPDATE
            )
            UPDATE tickets t
            SET status = 'available', reserved_until = NULL, order_id = NULL, updated_at = NOW()
            FROM expired
            WHERE t.id = expired.id
            RETURNING expired.order_id, expired.event_id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        if released.is_empty() {
            tx.commit().await?;
            return Ok(SweepOutcome::default());
        }

        let order_ids: Vec<i64> = released
            .iter()
            .map(|t| t.order_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        // Orders already settled or cancelled by a race winner are left
        // untouched.
        let cancelled = sqlx::query(
            "UPDATE orders SET status = 'cancelled', updated_at = NOW() WHERE id = ANY($1) AND status = 'pending'",
        )
        .bind(&order_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        // Released inventory invalidates event caches, post-commit
        let event_ids: HashSet<i64> = released.iter().map(|t| t.event_id).collect();
        for event_id in event_ids {
            self.cache.invalidate_event(event_id).await;
        }

        Ok(SweepOutcome {
            released_tickets: released.len() as u64,
            cancelled_orders: cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_outcome_is_default() {
        let outcome = SweepOutcome::default();
        assert_eq!(outcome.released_tickets, 0);
        assert_eq!(outcome.cancelled_orders, 0);
    }
}
