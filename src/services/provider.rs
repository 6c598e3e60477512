//! Payment provider capability port
//!
//! The actual provider client lives outside this crate; the engine only sees
//! this trait, injected at construction time so tests can substitute fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::subscription::SubscriptionStatus;
use crate::utils::errors::ProviderResult;

/// State of a charge intent as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeIntentStatus {
    RequiresConfirmation,
    Processing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for ChargeIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeIntentStatus::RequiresConfirmation => write!(f, "requires_confirmation"),
            ChargeIntentStatus::Processing => write!(f, "processing"),
            ChargeIntentStatus::Succeeded => write!(f, "succeeded"),
            ChargeIntentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Handle for an in-progress charge attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeIntent {
    pub id: String,
    pub client_secret: String,
}

/// Subscription object as the provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    /// Raw provider status string ("active", "past_due", "canceled", ...)
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Customer object as the provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
    pub email: String,
}

/// A verified, typed provider notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProviderEvent {
    ChargeSucceeded {
        intent_id: String,
        order_id: i64,
    },
    ChargeFailed {
        intent_id: String,
        order_id: Option<i64>,
        failure_reason: Option<String>,
    },
    SubscriptionCreated {
        subscription: ProviderSubscription,
    },
    SubscriptionUpdated {
        subscription: ProviderSubscription,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    InvoicePaymentSucceeded {
        subscription_id: String,
    },
    InvoicePaymentFailed {
        subscription_id: String,
    },
    /// Anything the reconciler does not act on
    Unknown {
        kind: String,
    },
}

/// External payment capability. One implementation wraps the real provider
/// API; tests inject in-memory fakes.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_charge_intent(
        &self,
        amount_cents: i64,
        order_id: i64,
        buyer_id: i64,
    ) -> ProviderResult<ChargeIntent>;

    async fn confirm_charge_intent(&self, intent_id: &str) -> ProviderResult<ChargeIntentStatus>;

    async fn create_customer(&self, email: &str, user_id: i64) -> ProviderResult<ProviderCustomer>;

    async fn get_customer(&self, customer_id: &str) -> ProviderResult<Option<ProviderCustomer>>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: &str,
    ) -> ProviderResult<ProviderSubscription>;

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<Option<ProviderSubscription>>;

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> ProviderResult<ProviderSubscription>;

    /// Verify an inbound notification's authenticity and parse it. Fails with
    /// `ProviderError::InvalidSignature` on a forged or malformed payload.
    async fn verify_notification(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ProviderResult<ProviderEvent>;
}

/// Map a provider subscription status onto the local lifecycle: active maps
/// to ACTIVE, explicit cancellation to CANCELLED, anything else to PAST_DUE.
pub fn map_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
        _ => SubscriptionStatus::PastDue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_mapping() {
        assert_eq!(map_provider_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_provider_status("canceled"), SubscriptionStatus::Cancelled);
        assert_eq!(map_provider_status("cancelled"), SubscriptionStatus::Cancelled);
        assert_eq!(map_provider_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_provider_status("incomplete"), SubscriptionStatus::PastDue);
        assert_eq!(map_provider_status("unpaid"), SubscriptionStatus::PastDue);
    }
}
