//! Read-side cache invalidation hook
//!
//! Best-effort only: every failure here is logged and swallowed, and the
//! hook is invoked after the owning transaction has committed, never inside
//! it.

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::config::settings::RedisConfig;

#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    client: redis::Client,
    prefix: String,
}

impl CacheInvalidator {
    pub fn new(config: &RedisConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            prefix: config.prefix.clone(),
        })
    }

    /// Drop cached reads for one event and the listing pages that include it
    pub async fn invalidate_event(&self, event_id: i64) {
        let keys = vec![
            format!("{}event:{}", self.prefix, event_id),
            format!("{}event:{}:tickets", self.prefix, event_id),
        ];
        if let Err(e) = self.delete_keys(&keys).await {
            warn!(event_id = event_id, error = %e, "Cache invalidation failed, continuing");
            return;
        }
        self.invalidate_listings().await;
    }

    /// Drop cached listing pages
    pub async fn invalidate_listings(&self) {
        let pattern = format!("{}events:list:*", self.prefix);
        if let Err(e) = self.delete_pattern(&pattern).await {
            warn!(error = %e, "Listing cache invalidation failed, continuing");
        }
    }

    /// Health check for the cache connection
    pub async fn health_check(&self) -> bool {
        match self.client.get_async_connection().await {
            Ok(mut conn) => {
                let result: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                matches!(result.as_deref(), Ok("PONG"))
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                false
            }
        }
    }

    async fn delete_keys(&self, keys: &[String]) -> redis::RedisResult<()> {
        let mut conn = self.client.get_async_connection().await?;
        let deleted: i64 = conn.del(keys).await?;
        debug!(deleted = deleted, "Cache keys invalidated");
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> redis::RedisResult<()> {
        let mut conn = self.client.get_async_connection().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(());
        }
        let deleted: i64 = conn.del(&keys).await?;
        debug!(pattern = %pattern, deleted = deleted, "Cache keys invalidated by pattern");
        Ok(())
    }
}
