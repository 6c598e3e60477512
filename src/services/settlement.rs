//! Settlement reconciler
//!
//! Applies payment-provider outcomes to orders and subscriptions. Both the
//! buyer-initiated confirmation and the provider's asynchronous
//! notifications converge here, and either may arrive late, twice, or out
//! of order, so every mutation is guarded on the current stored status
//! instead of overwriting blindly. Receiving the same notification twice
//! leaves the system in the same terminal state as receiving it once.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::database::repositories::payment::RecordPaymentRequest;
use crate::database::DatabaseService;
use crate::models::order::{Order, OrderStatus};
use crate::models::payment::PaymentStatus;
use crate::models::subscription::{SubscriptionStatus, UpsertSubscriptionRequest};
use crate::models::user::{Actor, UserRole};
use crate::services::orders::OrderService;
use crate::services::provider::{
    map_provider_status, ChargeIntentStatus, PaymentProvider, ProviderEvent, ProviderSubscription,
};
use crate::utils::errors::{ProviderError, Result, TicketDeskError};

/// Delay before the single re-fetch absorbing provider eventual consistency
const INVOICE_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// What a notification amounted to. Duplicates and business-irrelevant
/// events are successes, distinguishable from signature rejection so the
/// provider's retry behavior is respected without applying forged events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    OrderConfirmed { order_id: i64 },
    AlreadySettled { order_id: i64 },
    PaymentMarkedFailed { intent_id: String },
    SubscriptionSynced {
        provider_subscription_id: String,
        status: SubscriptionStatus,
    },
    Ignored,
}

#[derive(Clone)]
pub struct SettlementService {
    provider: Arc<dyn PaymentProvider>,
    orders: OrderService,
    db: DatabaseService,
    invoice_retry_delay: Duration,
}

impl SettlementService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        orders: OrderService,
        db: DatabaseService,
    ) -> Self {
        Self {
            provider,
            orders,
            db,
            invoice_retry_delay: INVOICE_RETRY_DELAY,
        }
    }

    /// Override the invoice re-fetch delay
    pub fn with_invoice_retry_delay(mut self, delay: Duration) -> Self {
        self.invoice_retry_delay = delay;
        self
    }

    /// Synchronous confirmation path: the buyer's client reports a charge
    /// intent as completed; verify with the provider before settling.
    pub async fn confirm_payment(
        &self,
        actor: Actor,
        order_id: i64,
        intent_id: &str,
    ) -> Result<SettlementOutcome> {
        let status = self.provider.confirm_charge_intent(intent_id).await?;
        if status != ChargeIntentStatus::Succeeded {
            return Err(TicketDeskError::PaymentNotCompleted {
                intent_id: intent_id.to_string(),
                status: status.to_string(),
            });
        }

        match self
            .orders
            .pay_order(order_id, actor, "card", Some(intent_id.to_string()))
            .await
        {
            Ok(_) => {
                info!(order_id = order_id, intent_id = %intent_id, "Order settled via client confirmation");
                Ok(SettlementOutcome::OrderConfirmed { order_id })
            }
            Err(TicketDeskError::OrderNotPending {
                status: OrderStatus::Confirmed,
                ..
            }) => {
                // The provider's notification won the race. Converge the
                // ledger row and report success, as the async path does.
                if let Some(order) = self.db.orders.find_by_id(order_id).await? {
                    self.record_completed_payment(&order, intent_id).await?;
                }
                debug!(order_id = order_id, intent_id = %intent_id, "Order already settled, duplicate confirmation absorbed");
                Ok(SettlementOutcome::AlreadySettled { order_id })
            }
            Err(e) => Err(e),
        }
    }

    /// Asynchronous notification path. Authenticity is verified before any
    /// state is touched; a bad signature mutates nothing.
    pub async fn handle_notification(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<SettlementOutcome> {
        let event = self
            .provider
            .verify_notification(payload, signature)
            .await
            .map_err(|e| match e {
                ProviderError::InvalidSignature => TicketDeskError::InvalidNotificationSignature,
                other => TicketDeskError::Provider(other),
            })?;

        debug!(event = ?event, "Provider notification verified");

        match event {
            ProviderEvent::ChargeSucceeded { intent_id, order_id } => {
                self.apply_charge_succeeded(&intent_id, order_id).await
            }
            ProviderEvent::ChargeFailed {
                intent_id,
                order_id,
                failure_reason,
            } => {
                self.apply_charge_failed(&intent_id, order_id, failure_reason)
                    .await
            }
            ProviderEvent::SubscriptionCreated { subscription }
            | ProviderEvent::SubscriptionUpdated { subscription } => {
                self.sync_subscription(&subscription, None).await
            }
            ProviderEvent::SubscriptionDeleted { subscription_id } => {
                self.apply_subscription_deleted(&subscription_id).await
            }
            ProviderEvent::InvoicePaymentSucceeded { subscription_id }
            | ProviderEvent::InvoicePaymentFailed { subscription_id } => {
                self.resync_subscription_from_provider(&subscription_id).await
            }
            ProviderEvent::Unknown { kind } => {
                debug!(kind = %kind, "Ignoring provider event kind");
                Ok(SettlementOutcome::Ignored)
            }
        }
    }

    async fn apply_charge_succeeded(
        &self,
        intent_id: &str,
        order_id: i64,
    ) -> Result<SettlementOutcome> {
        let Some(order) = self.db.orders.find_by_id(order_id).await? else {
            warn!(order_id = order_id, intent_id = %intent_id, "Charge succeeded for unknown order");
            return Ok(SettlementOutcome::Ignored);
        };

        match self
            .orders
            .settle_order(order_id, "card", Some(intent_id.to_string()))
            .await
        {
            Ok(_) => {
                info!(order_id = order_id, intent_id = %intent_id, "Order settled via provider notification");
                Ok(SettlementOutcome::OrderConfirmed { order_id })
            }
            Err(TicketDeskError::OrderNotPending {
                status: OrderStatus::Confirmed,
                ..
            }) => {
                // Duplicate delivery or the synchronous path won the race.
                // Converge the ledger row and report success.
                self.record_completed_payment(&order, intent_id).await?;
                debug!(order_id = order_id, intent_id = %intent_id, "Order already settled, duplicate absorbed");
                Ok(SettlementOutcome::AlreadySettled { order_id })
            }
            Err(TicketDeskError::OrderNotPending { status, .. }) => {
                // The hold expired and the sweep won; the ledger still
                // records the provider's charge. Refunds are post-sale.
                self.record_completed_payment(&order, intent_id).await?;
                warn!(
                    order_id = order_id,
                    status = %status,
                    intent_id = %intent_id,
                    "Charge succeeded for an order no longer pending"
                );
                Ok(SettlementOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_charge_failed(
        &self,
        intent_id: &str,
        order_id: Option<i64>,
        failure_reason: Option<String>,
    ) -> Result<SettlementOutcome> {
        if let Some(payment) = self
            .db
            .payments
            .mark_failed_by_reference(intent_id, failure_reason.clone())
            .await?
        {
            info!(
                payment_id = payment.id,
                order_id = payment.order_id,
                intent_id = %intent_id,
                "Payment marked failed"
            );
            return Ok(SettlementOutcome::PaymentMarkedFailed {
                intent_id: intent_id.to_string(),
            });
        }

        // Zero rows updated: either the charge already settled as completed
        // (a late or out-of-order failure, absorbed) or no ledger row exists
        // yet.
        if let Some(existing) = self.db.payments.find_by_reference(intent_id).await? {
            warn!(
                payment_id = existing.id,
                order_id = existing.order_id,
                intent_id = %intent_id,
                "Charge failure after settlement absorbed"
            );
            return Ok(SettlementOutcome::Ignored);
        }

        // No ledger row yet; create one so the failure is recorded. The
        // order itself stays pending and may be retried or swept.
        let Some(order_id) = order_id else {
            warn!(intent_id = %intent_id, "Charge failed with no payment record or order reference");
            return Ok(SettlementOutcome::Ignored);
        };
        let Some(order) = self.db.orders.find_by_id(order_id).await? else {
            warn!(order_id = order_id, intent_id = %intent_id, "Charge failed for unknown order");
            return Ok(SettlementOutcome::Ignored);
        };

        self.db
            .payments
            .record(RecordPaymentRequest {
                order_id: order.id,
                user_id: order.user_id,
                amount_cents: order.total_cents,
                method: "card".to_string(),
                status: PaymentStatus::Failed,
                external_reference: Some(intent_id.to_string()),
                failure_reason,
            })
            .await?;

        info!(order_id = order_id, intent_id = %intent_id, "Failed charge recorded");
        Ok(SettlementOutcome::PaymentMarkedFailed {
            intent_id: intent_id.to_string(),
        })
    }

    async fn apply_subscription_deleted(&self, subscription_id: &str) -> Result<SettlementOutcome> {
        let Some(local) = self.db.subscriptions.find_by_provider_id(subscription_id).await? else {
            warn!(subscription_id = %subscription_id, "Deletion notification for unknown subscription");
            return Ok(SettlementOutcome::Ignored);
        };

        let subscription = ProviderSubscription {
            id: local.provider_subscription_id,
            customer_id: local.provider_customer_id,
            status: "canceled".to_string(),
            current_period_end: local.current_period_end,
            cancel_at_period_end: local.cancel_at_period_end,
        };
        self.sync_subscription(&subscription, Some(SubscriptionStatus::Cancelled))
            .await
    }

    /// Invoice events carry no subscription object; re-resolve it from the
    /// provider, once more after a short delay if it has not yet settled
    /// into an active state.
    async fn resync_subscription_from_provider(
        &self,
        subscription_id: &str,
    ) -> Result<SettlementOutcome> {
        let Some(mut subscription) = self.provider.get_subscription(subscription_id).await? else {
            warn!(subscription_id = %subscription_id, "Invoice notification for unknown subscription");
            return Ok(SettlementOutcome::Ignored);
        };

        if map_provider_status(&subscription.status) != SubscriptionStatus::Active {
            tokio::time::sleep(self.invoice_retry_delay).await;
            if let Some(refreshed) = self.provider.get_subscription(subscription_id).await? {
                subscription = refreshed;
            }
        }

        self.sync_subscription(&subscription, None).await
    }

    async fn sync_subscription(
        &self,
        subscription: &ProviderSubscription,
        forced_status: Option<SubscriptionStatus>,
    ) -> Result<SettlementOutcome> {
        let status = forced_status.unwrap_or_else(|| map_provider_status(&subscription.status));

        // Resolve the owning user: an existing local row wins, otherwise the
        // provider customer reference.
        let user_id = if let Some(local) = self
            .db
            .subscriptions
            .find_by_provider_id(&subscription.id)
            .await?
        {
            local.user_id
        } else if let Some(user) = self
            .db
            .users
            .find_by_customer_reference(&subscription.customer_id)
            .await?
        {
            user.id
        } else {
            warn!(
                subscription_id = %subscription.id,
                customer_id = %subscription.customer_id,
                "Subscription notification with no resolvable user"
            );
            return Ok(SettlementOutcome::Ignored);
        };

        let local = self
            .db
            .subscriptions
            .upsert(UpsertSubscriptionRequest {
                user_id,
                provider_customer_id: subscription.customer_id.clone(),
                provider_subscription_id: subscription.id.clone(),
                status,
                current_period_end: subscription.current_period_end,
                cancel_at_period_end: subscription.cancel_at_period_end,
            })
            .await?;

        self.sync_user_role(user_id, status).await?;

        info!(
            subscription_id = %local.provider_subscription_id,
            user_id = user_id,
            status = %status,
            "Subscription reconciled"
        );
        Ok(SettlementOutcome::SubscriptionSynced {
            provider_subscription_id: local.provider_subscription_id,
            status,
        })
    }

    /// An active subscription grants organizer capability; cancellation
    /// revokes it. Admins are never touched.
    async fn sync_user_role(&self, user_id: i64, status: SubscriptionStatus) -> Result<()> {
        let Some(user) = self.db.users.find_by_id(user_id).await? else {
            warn!(user_id = user_id, "Subscription owner missing during role sync");
            return Ok(());
        };

        match (status, user.role) {
            (SubscriptionStatus::Active, UserRole::User) => {
                self.db.users.set_role(user_id, UserRole::Organizer).await?;
                info!(user_id = user_id, "User promoted to organizer");
            }
            (SubscriptionStatus::Cancelled, UserRole::Organizer) => {
                self.db.users.set_role(user_id, UserRole::User).await?;
                info!(user_id = user_id, "User demoted from organizer");
            }
            _ => {}
        }

        Ok(())
    }

    async fn record_completed_payment(&self, order: &Order, intent_id: &str) -> Result<()> {
        self.db
            .payments
            .record(RecordPaymentRequest {
                order_id: order.id,
                user_id: order.user_id,
                amount_cents: order.total_cents,
                method: "card".to_string(),
                status: PaymentStatus::Completed,
                external_reference: Some(intent_id.to_string()),
                failure_reason: None,
            })
            .await?;
        Ok(())
    }
}
