//! In-memory payment provider fake
//!
//! Notifications are JSON-encoded `ProviderEvent` payloads accepted only
//! with the fixed test signature, so forged-signature paths are exercised
//! without real crypto.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use TicketDesk::services::provider::{
    ChargeIntent, ChargeIntentStatus, PaymentProvider, ProviderCustomer, ProviderEvent,
    ProviderSubscription,
};
use TicketDesk::utils::errors::ProviderError;

type ProviderResult<T> = Result<T, ProviderError>;

pub const VALID_SIGNATURE: &str = "test-signature";

pub struct MockProvider {
    confirm_status: Mutex<ChargeIntentStatus>,
    subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            confirm_status: Mutex::new(ChargeIntentStatus::Succeeded),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_confirm_status(status: ChargeIntentStatus) -> Self {
        let provider = Self::new();
        *provider.confirm_status.lock().unwrap() = status;
        provider
    }

    pub fn insert_subscription(&self, subscription: ProviderSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    /// Encode an event the way the real provider would deliver it
    pub fn payload(event: &ProviderEvent) -> Vec<u8> {
        serde_json::to_vec(event).expect("failed to encode provider event")
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_charge_intent(
        &self,
        _amount_cents: i64,
        order_id: i64,
        _buyer_id: i64,
    ) -> ProviderResult<ChargeIntent> {
        Ok(ChargeIntent {
            id: format!("pi_order_{order_id}"),
            client_secret: format!("secret_{order_id}"),
        })
    }

    async fn confirm_charge_intent(&self, _intent_id: &str) -> ProviderResult<ChargeIntentStatus> {
        Ok(*self.confirm_status.lock().unwrap())
    }

    async fn create_customer(&self, email: &str, user_id: i64) -> ProviderResult<ProviderCustomer> {
        Ok(ProviderCustomer {
            id: format!("cus_{user_id}"),
            email: email.to_string(),
        })
    }

    async fn get_customer(&self, _customer_id: &str) -> ProviderResult<Option<ProviderCustomer>> {
        Ok(None)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: &str,
    ) -> ProviderResult<ProviderSubscription> {
        let subscription = ProviderSubscription {
            id: format!("sub_{customer_id}_{plan}"),
            customer_id: customer_id.to_string(),
            status: "active".to_string(),
            current_period_end: Some(chrono::Utc::now() + chrono::Duration::days(30)),
            cancel_at_period_end: false,
        };
        self.insert_subscription(subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<Option<ProviderSubscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> ProviderResult<ProviderSubscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| ProviderError::InvalidResponse("unknown subscription".to_string()))?;

        if at_period_end {
            subscription.cancel_at_period_end = true;
        } else {
            subscription.status = "canceled".to_string();
        }
        Ok(subscription.clone())
    }

    async fn verify_notification(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ProviderResult<ProviderEvent> {
        if signature != VALID_SIGNATURE {
            return Err(ProviderError::InvalidSignature);
        }
        serde_json::from_slice(payload)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
