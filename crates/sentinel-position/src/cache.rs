//! Time-to-live cache over broker positions.
//!
//! Bounds broker API calls: cycle- and tick-driven management both
//! read positions, and without a staleness window every tick would
//! hit the broker. Any local order that changes a position must
//! invalidate immediately.

use parking_lot::Mutex;
use sentinel_core::Position;
use sentinel_providers::{BrokerConnector, ProviderResult};
use std::time::{Duration, Instant};
use tracing::trace;

struct CacheSlot {
    fetched_at: Instant,
    positions: Vec<Position>,
}

/// TTL-cached view of open positions.
pub struct PositionCache {
    ttl: Duration,
    slot: Mutex<Option<CacheSlot>>,
}

impl PositionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Positions, served from cache inside the TTL window.
    pub async fn get(&self, broker: &dyn BrokerConnector) -> ProviderResult<Vec<Position>> {
        {
            let slot = self.slot.lock();
            if let Some(cached) = slot.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    trace!("Position cache hit");
                    return Ok(cached.positions.clone());
                }
            }
        }

        // Lock is released across the await; a concurrent refresh just
        // overwrites with equally-fresh data.
        let positions = broker.get_positions().await?;
        *self.slot.lock() = Some(CacheSlot {
            fetched_at: Instant::now(),
            positions: positions.clone(),
        });
        Ok(positions)
    }

    /// Drop the cached view. Called after any order that changes a
    /// position.
    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentinel_core::{AccountSnapshot, Order, OrderRequest};
    use sentinel_providers::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingBroker {
        calls: AtomicU32,
    }

    #[async_trait]
    impl BrokerConnector for CountingBroker {
        async fn get_account(&self) -> ProviderResult<AccountSnapshot> {
            Err(ProviderError::Unavailable("test".into()))
        }

        async fn get_positions(&self) -> ProviderResult<Vec<Position>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn create_order(&self, _request: OrderRequest) -> ProviderResult<Order> {
            Err(ProviderError::Unavailable("test".into()))
        }

        async fn get_order(&self, order_id: &str) -> ProviderResult<Order> {
            Err(ProviderError::OrderNotFound(order_id.to_string()))
        }

        async fn cancel_order(&self, _order_id: &str) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_serves_from_cache_within_ttl() {
        let broker = CountingBroker::default();
        let cache = PositionCache::new(Duration::from_secs(30));
        cache.get(&broker).await.unwrap();
        cache.get(&broker).await.unwrap();
        assert_eq!(broker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let broker = CountingBroker::default();
        let cache = PositionCache::new(Duration::from_secs(30));
        cache.get(&broker).await.unwrap();
        cache.invalidate();
        cache.get(&broker).await.unwrap();
        assert_eq!(broker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_ttl_refetches() {
        let broker = CountingBroker::default();
        let cache = PositionCache::new(Duration::from_millis(0));
        cache.get(&broker).await.unwrap();
        cache.get(&broker).await.unwrap();
        assert_eq!(broker.calls.load(Ordering::SeqCst), 2);
    }
}
