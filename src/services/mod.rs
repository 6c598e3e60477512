//! Services module
//!
//! This module contains business logic services

pub mod cache;
pub mod orders;
pub mod provider;
pub mod settlement;
pub mod sweeper;

// Re-export commonly used services
pub use cache::CacheInvalidator;
pub use orders::OrderService;
pub use provider::{ChargeIntent, ChargeIntentStatus, PaymentProvider, ProviderEvent};
pub use settlement::{SettlementOutcome, SettlementService};
pub use sweeper::{SweepOutcome, SweeperService};

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::database::{DatabasePool, DatabaseService};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub database: DatabaseService,
    pub orders: OrderService,
    pub sweeper: SweeperService,
    pub cache: CacheInvalidator,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(pool: DatabasePool, settings: &Settings) -> Result<Self> {
        let cache = CacheInvalidator::new(&settings.redis)?;
        let database = DatabaseService::new(pool.clone());
        let orders = OrderService::new(pool.clone(), cache.clone(), settings.sweeper.hold_minutes);
        let sweeper = SweeperService::new(pool, cache.clone(), settings.sweeper.interval_minutes);

        Ok(Self {
            database,
            orders,
            sweeper,
            cache,
        })
    }

    /// Build the settlement reconciler around a payment provider
    /// implementation chosen by the caller.
    pub fn settlement(&self, provider: Arc<dyn PaymentProvider>) -> SettlementService {
        SettlementService::new(provider, self.orders.clone(), self.database.clone())
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = crate::database::health_check(self.orders.pool()).await.is_ok();
        let redis_healthy = self.cache.health_check().await;

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub redis_healthy: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.redis_healthy {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}
